//! Single-replication runner
//!
//! Wires a fresh scheduler, unit, arrival stream and monitor together for one
//! seeded replication and collects the raw output.

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::engine::{Scheduler, SimTime};
use crate::hospital::{BlockingEpisode, HospitalSystem, Patient, PoolSample};
use crate::simulation::{SimulationError, SimulationResult};
use crate::types::{PoolKind, SimulationConfig};

/// Raw output of one replication
#[derive(Debug, Clone, Serialize)]
pub struct ReplicationOutput {
    /// Zero-based replication index
    pub replication_id: usize,
    /// Seed the replication's random stream was created with
    pub seed: u64,
    /// Patients that departed strictly after warmup, in departure order
    pub completed_patients: Vec<Patient>,
    /// Preparation room samples
    pub prep_samples: Vec<PoolSample>,
    /// Theatre samples
    pub theatre_samples: Vec<PoolSample>,
    /// Recovery bed samples
    pub recovery_samples: Vec<PoolSample>,
    /// Post-warmup monitor ticks
    pub monitor_ticks: u64,
    /// Post-warmup monitor ticks with every recovery bed busy
    pub recovery_saturated_ticks: u64,
    /// Patients that arrived over the whole run
    pub total_arrived: u64,
    /// Patients that departed over the whole run
    pub total_departed: u64,
    /// Operations that ended with the recovery pool full, whole run
    pub num_blocking_events: u64,
    /// Total theatre blocked time over the whole run, in minutes
    pub theatre_blocked_time: f64,
    /// Every completed blocking interval
    pub blocking_episodes: Vec<BlockingEpisode>,
    /// Events the scheduler dispatched
    pub events_processed: u64,
}

impl ReplicationOutput {
    /// Pool samples for one pool
    pub fn samples(&self, kind: PoolKind) -> &[PoolSample] {
        match kind {
            PoolKind::Preparation => &self.prep_samples,
            PoolKind::Theatre => &self.theatre_samples,
            PoolKind::Recovery => &self.recovery_samples,
        }
    }

    /// Returns `true` if no patient departed after warmup
    pub fn is_degenerate(&self) -> bool {
        self.completed_patients.is_empty()
    }
}

/// Runs seeded replications of one configuration
#[derive(Debug, Clone)]
pub struct ReplicationRunner {
    config: SimulationConfig,
    horizon: SimTime,
}

impl ReplicationRunner {
    /// Create a runner, rejecting invalid configuration up front
    pub fn new(config: SimulationConfig) -> SimulationResult<Self> {
        config.validate()?;
        let horizon = SimTime::new(config.sim_duration).ok_or_else(|| {
            SimulationError::configuration_error(format!(
                "invalid simulation duration {}",
                config.sim_duration
            ))
        })?;
        Ok(Self { config, horizon })
    }

    /// Configuration being replicated
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Run replication `index` with seed `random_seed + index`
    pub fn run(&self, index: usize) -> SimulationResult<ReplicationOutput> {
        self.run_with_seed(index, self.config.seed_for(index))
    }

    /// Run replication `index` with an explicit seed
    #[instrument(skip(self), fields(scenario = %self.config.scenario_name()))]
    pub fn run_with_seed(&self, index: usize, seed: u64) -> SimulationResult<ReplicationOutput> {
        debug!("Starting replication {}", index);

        let mut scheduler = Scheduler::new();
        let mut system = HospitalSystem::new(&self.config, seed)?;
        system.start(&mut scheduler)?;
        let summary = scheduler.run(self.horizon, &mut system)?;

        let outcome = system.into_outcome();
        let output = ReplicationOutput {
            replication_id: index,
            seed,
            completed_patients: outcome.completed,
            prep_samples: outcome.monitor.prep,
            theatre_samples: outcome.monitor.theatre,
            recovery_samples: outcome.monitor.recovery,
            monitor_ticks: outcome.monitor.ticks,
            recovery_saturated_ticks: outcome.monitor.recovery_saturated_ticks,
            total_arrived: outcome.total_arrived,
            total_departed: outcome.total_departed,
            num_blocking_events: outcome.blocking.events,
            theatre_blocked_time: outcome.blocking.blocked_time,
            blocking_episodes: outcome.blocking.episodes,
            events_processed: summary.events_processed,
        };

        if output.is_degenerate() {
            warn!(
                "Replication {} completed no patients after warmup ({} arrived)",
                index, output.total_arrived
            );
        }
        info!(
            arrived = output.total_arrived,
            departed = output.total_departed,
            retained = output.completed_patients.len(),
            blocking_events = output.num_blocking_events,
            events = output.events_processed,
            "Completed replication {}",
            index
        );

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let config = SimulationConfig { num_recovery_rooms: 0, ..SimulationConfig::default() };
        assert!(ReplicationRunner::new(config).is_err());
    }

    #[test]
    fn test_seed_derived_from_index() {
        let runner = ReplicationRunner::new(SimulationConfig::default()).unwrap();
        let output = runner.run(3).unwrap();
        assert_eq!(output.replication_id, 3);
        assert_eq!(output.seed, 45);
    }

    #[test]
    fn test_same_index_reproduces_patients() {
        let runner = ReplicationRunner::new(SimulationConfig::default()).unwrap();
        let first = runner.run(0).unwrap();
        let second = runner.run(0).unwrap();
        assert_eq!(first.completed_patients, second.completed_patients);
        assert_eq!(first.blocking_episodes, second.blocking_episodes);
        assert_eq!(first.events_processed, second.events_processed);
    }

    #[test]
    fn test_patient_ids_restart_each_replication() {
        let runner = ReplicationRunner::new(SimulationConfig::default()).unwrap();
        let config = runner.config().clone();
        let warmup = config.warmup_period;
        for index in 0..3 {
            let output = runner.run(index).unwrap();
            let max_id = output.completed_patients.iter().map(|p| p.id.raw()).max().unwrap();
            assert!(max_id <= output.total_arrived);
            assert!(output.completed_patients.iter().all(|p| p.departure_time.unwrap().minutes() > warmup));
        }
    }

    #[test]
    fn test_blocked_time_equals_sum_of_episodes() {
        let config = SimulationConfig { num_recovery_rooms: 1, ..SimulationConfig::default() };
        let runner = ReplicationRunner::new(config).unwrap();
        let output = runner.run(0).unwrap();

        let sum: f64 = output.blocking_episodes.iter().map(|e| e.duration()).sum();
        assert!((output.theatre_blocked_time - sum).abs() < 1e-9);
        assert!(output.num_blocking_events >= output.blocking_episodes.len() as u64);
    }
}
