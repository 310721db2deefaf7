//! Patient records
//!
//! A [`Patient`] is created at arrival with its three service durations
//! already drawn, and is filled in phase by phase by its own process.

use serde::{Deserialize, Serialize};

use crate::engine::SimTime;
use crate::types::PatientId;

/// Service durations drawn for one patient, in minutes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServiceTimes {
    /// Time spent in a preparation room
    pub prep: f64,
    /// Time spent in the operating theatre, excluding any blocking
    pub operation: f64,
    /// Time spent in a recovery bed
    pub recovery: f64,
}

impl ServiceTimes {
    /// Create a set of service durations
    pub fn new(prep: f64, operation: f64, recovery: f64) -> Self {
        Self { prep, operation, recovery }
    }
}

/// One interval during which a theatre was held by a patient waiting for a
/// recovery bed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockingEpisode {
    /// Patient occupying the theatre
    pub patient_id: PatientId,
    /// End of the operation
    pub start: SimTime,
    /// Instant the recovery bed was granted
    pub end: SimTime,
}

impl BlockingEpisode {
    /// Length of the episode in minutes
    pub fn duration(&self) -> f64 {
        self.end.since(self.start)
    }
}

/// A patient and every timestamp recorded on its way through the unit.
///
/// Phase timestamps are `None` until the phase is reached. Blocking fields are
/// populated only when `was_blocked` is true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    /// Identifier, unique within one replication
    pub id: PatientId,
    /// Arrival instant
    pub arrival_time: SimTime,
    /// Drawn service durations
    pub service: ServiceTimes,
    /// Preparation room granted
    pub prep_start: Option<SimTime>,
    /// Preparation finished and room released
    pub prep_end: Option<SimTime>,
    /// Theatre granted
    pub operation_start: Option<SimTime>,
    /// Operation finished; the theatre may still be held
    pub operation_end: Option<SimTime>,
    /// Recovery bed granted and theatre released
    pub recovery_start: Option<SimTime>,
    /// Recovery finished
    pub recovery_end: Option<SimTime>,
    /// Left the unit
    pub departure_time: Option<SimTime>,
    /// Whether the recovery pool was full when the operation ended
    pub was_blocked: bool,
    /// Start of the blocking interval
    pub blocking_start: Option<SimTime>,
    /// End of the blocking interval
    pub blocking_end: Option<SimTime>,
    /// Length of the blocking interval in minutes
    pub blocking_duration: Option<f64>,
    /// Recovery beds in use at the instant the operation ended
    pub recovery_busy_at_operation_end: Option<usize>,
}

impl Patient {
    /// Create a freshly arrived patient
    pub fn new(id: PatientId, arrival_time: SimTime, service: ServiceTimes) -> Self {
        Self {
            id,
            arrival_time,
            service,
            prep_start: None,
            prep_end: None,
            operation_start: None,
            operation_end: None,
            recovery_start: None,
            recovery_end: None,
            departure_time: None,
            was_blocked: false,
            blocking_start: None,
            blocking_end: None,
            blocking_duration: None,
            recovery_busy_at_operation_end: None,
        }
    }

    /// Total time in the system, arrival to departure
    pub fn throughput_time(&self) -> Option<f64> {
        self.departure_time.map(|departed| departed.since(self.arrival_time))
    }

    /// Time between arrival and getting a preparation room
    pub fn wait_for_prep(&self) -> Option<f64> {
        self.prep_start.map(|start| start.since(self.arrival_time))
    }

    /// Time between leaving preparation and getting a theatre
    pub fn wait_for_operation(&self) -> Option<f64> {
        Some(self.operation_start?.since(self.prep_end?))
    }

    /// Time between the end of the operation and getting a recovery bed
    pub fn wait_for_recovery(&self) -> Option<f64> {
        Some(self.recovery_start?.since(self.operation_end?))
    }

    /// Returns `true` once the patient has left the unit
    pub fn has_departed(&self) -> bool {
        self.departure_time.is_some()
    }

    /// Phase timestamps in flow order, stopping at the first unset one
    pub fn timeline(&self) -> Vec<SimTime> {
        let phases = [
            self.prep_start,
            self.prep_end,
            self.operation_start,
            self.operation_end,
            self.recovery_start,
            self.recovery_end,
            self.departure_time,
        ];
        std::iter::once(self.arrival_time).chain(phases.into_iter().map_while(|t| t)).collect()
    }

    /// The blocking interval, if the patient was blocked and has been granted a bed
    pub fn blocking_episode(&self) -> Option<BlockingEpisode> {
        if !self.was_blocked {
            return None;
        }
        Some(BlockingEpisode { patient_id: self.id, start: self.blocking_start?, end: self.blocking_end? })
    }
}
