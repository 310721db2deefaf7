//! Periodic pool sampling
//!
//! The monitor wakes every `monitoring_interval` minutes and, once past the
//! warmup threshold, records one [`PoolSample`] per pool.

use serde::{Deserialize, Serialize};

use super::system::Resources;
use crate::engine::SimTime;
use crate::types::PoolKind;

/// Occupancy of one pool at one sampling instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoolSample {
    /// Sampling instant
    pub time: SimTime,
    /// Requests waiting for a slot
    pub queue_length: usize,
    /// Slots held
    pub in_use: usize,
    /// `in_use / capacity`
    pub utilization: f64,
}

/// Everything the monitor recorded during one replication
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorLog {
    /// Preparation room samples
    pub prep: Vec<PoolSample>,
    /// Theatre samples
    pub theatre: Vec<PoolSample>,
    /// Recovery bed samples
    pub recovery: Vec<PoolSample>,
    /// Number of post-warmup sampling instants
    pub ticks: u64,
    /// Sampling instants at which every recovery bed was in use
    pub recovery_saturated_ticks: u64,
}

impl MonitorLog {
    /// Samples recorded for one pool
    pub fn samples(&self, kind: PoolKind) -> &[PoolSample] {
        match kind {
            PoolKind::Preparation => &self.prep,
            PoolKind::Theatre => &self.theatre,
            PoolKind::Recovery => &self.recovery,
        }
    }

    /// Fraction of sampling instants with every recovery bed busy
    pub fn recovery_saturation(&self) -> Option<f64> {
        if self.ticks == 0 {
            None
        } else {
            Some(self.recovery_saturated_ticks as f64 / self.ticks as f64)
        }
    }
}

/// Fixed-interval sampler of pool occupancy
#[derive(Debug, Clone)]
pub struct Monitor {
    interval: f64,
    warmup: SimTime,
    log: MonitorLog,
}

impl Monitor {
    /// Create a monitor sampling every `interval` minutes after `warmup`
    pub fn new(interval: f64, warmup: SimTime) -> Self {
        Self { interval, warmup, log: MonitorLog::default() }
    }

    /// Minutes between samples
    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Take one sample per pool if `now` is strictly past the warmup.
    ///
    /// Returns `true` if a sample was recorded.
    pub fn observe(&mut self, now: SimTime, resources: &Resources) -> bool {
        if now <= self.warmup {
            return false;
        }

        for kind in PoolKind::ALL {
            let snapshot = resources.pool(kind).snapshot();
            let sample = PoolSample {
                time: now,
                queue_length: snapshot.queue_length,
                in_use: snapshot.in_use,
                utilization: snapshot.utilization(),
            };
            match kind {
                PoolKind::Preparation => self.log.prep.push(sample),
                PoolKind::Theatre => self.log.theatre.push(sample),
                PoolKind::Recovery => self.log.recovery.push(sample),
            }
        }

        self.log.ticks += 1;
        if resources.pool(PoolKind::Recovery).is_full() {
            self.log.recovery_saturated_ticks += 1;
        }
        true
    }

    /// Samples recorded so far
    pub fn log(&self) -> &MonitorLog {
        &self.log
    }

    /// Consume the monitor, returning its samples
    pub fn into_log(self) -> MonitorLog {
        self.log
    }
}
