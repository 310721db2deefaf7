//! Simulated time
//!
//! Time is a scalar number of simulated minutes. It advances only when the
//! scheduler dispatches an event, never from wall-clock observation.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A point on the simulated clock, in minutes.
///
/// Wraps an `f64` but is totally ordered (via `f64::total_cmp`) so it can key
/// the scheduler's heap. Constructors reject NaN.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimTime(f64);

impl SimTime {
    /// The zero-point of simulated time
    pub const ZERO: SimTime = SimTime(0.0);

    /// Create a time from a number of minutes.
    ///
    /// Returns `None` for NaN or negative values.
    pub fn new(minutes: f64) -> Option<Self> {
        if minutes.is_nan() || minutes < 0.0 {
            None
        } else {
            Some(SimTime(minutes))
        }
    }

    /// Raw number of minutes
    #[inline]
    pub fn minutes(self) -> f64 {
        self.0
    }

    /// The time `delay` minutes after `self`
    #[inline]
    pub fn plus(self, delay: f64) -> SimTime {
        SimTime(self.0 + delay)
    }

    /// Minutes elapsed since `earlier` (negative if `earlier` is later)
    #[inline]
    pub fn since(self, earlier: SimTime) -> f64 {
        self.0 - earlier.0
    }

    /// Returns `true` if `self` is strictly before `other`
    #[inline]
    pub fn is_before(self, other: SimTime) -> bool {
        self < other
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Default for SimTime {
    fn default() -> Self {
        SimTime::ZERO
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={:.3}", self.0)
    }
}
