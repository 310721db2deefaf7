//! Poisson arrival stream
//!
//! Owns the replication's only random number stream. Draws are consumed in a
//! fixed order (interarrival gap, then the new patient's prep, operation and
//! recovery durations) so a seed fully determines the replication.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Exp};

use super::patient::ServiceTimes;
use crate::simulation::{SimulationError, SimulationResult};
use crate::types::SimulationConfig;

/// Exponential interarrival and service-time sampler for one replication
#[derive(Debug, Clone)]
pub struct ArrivalGenerator {
    rng: StdRng,
    interarrival: Exp<f64>,
    prep: Exp<f64>,
    operation: Exp<f64>,
    recovery: Exp<f64>,
    seed: u64,
}

fn exponential(field: &str, mean: f64) -> SimulationResult<Exp<f64>> {
    if !(mean.is_finite() && mean > 0.0) {
        return Err(SimulationError::distribution_error(format!(
            "{} must be a positive finite mean, got {}",
            field, mean
        )));
    }
    Exp::new(1.0 / mean).map_err(|e| {
        SimulationError::distribution_error(format!("{} (mean {}): {}", field, mean, e))
    })
}

impl ArrivalGenerator {
    /// Create a generator seeded with `seed`, using the configured means
    pub fn new(config: &SimulationConfig, seed: u64) -> SimulationResult<Self> {
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            interarrival: exponential("mean_interarrival", config.mean_interarrival)?,
            prep: exponential("mean_prep_time", config.mean_prep_time)?,
            operation: exponential("mean_operation_time", config.mean_operation_time)?,
            recovery: exponential("mean_recovery_time", config.mean_recovery_time)?,
            seed,
        })
    }

    /// Seed this generator was created with
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Draw the gap until the next arrival
    pub fn next_interarrival(&mut self) -> f64 {
        self.interarrival.sample(&mut self.rng)
    }

    /// Draw the three service durations for a newly arrived patient
    pub fn next_service_times(&mut self) -> ServiceTimes {
        let prep = self.prep.sample(&mut self.rng);
        let operation = self.operation.sample(&mut self.rng);
        let recovery = self.recovery.sample(&mut self.rng);
        ServiceTimes { prep, operation, recovery }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_draws() {
        let config = SimulationConfig::default();
        let mut a = ArrivalGenerator::new(&config, 7).unwrap();
        let mut b = ArrivalGenerator::new(&config, 7).unwrap();

        for _ in 0..20 {
            assert_eq!(a.next_interarrival(), b.next_interarrival());
            assert_eq!(a.next_service_times(), b.next_service_times());
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let config = SimulationConfig::default();
        let mut a = ArrivalGenerator::new(&config, 1).unwrap();
        let mut b = ArrivalGenerator::new(&config, 2).unwrap();

        let draws_a: Vec<f64> = (0..10).map(|_| a.next_interarrival()).collect();
        let draws_b: Vec<f64> = (0..10).map(|_| b.next_interarrival()).collect();
        assert_ne!(draws_a, draws_b);
    }

    #[test]
    fn test_sample_mean_close_to_configured_mean() {
        let config = SimulationConfig::default();
        let mut generator = ArrivalGenerator::new(&config, 42).unwrap();

        let n = 20_000;
        let total: f64 = (0..n).map(|_| generator.next_interarrival()).sum();
        let mean = total / n as f64;
        assert!((mean - config.mean_interarrival).abs() < 1.0, "sample mean {}", mean);
    }

    #[test]
    fn test_draws_are_positive() {
        let config = SimulationConfig::default();
        let mut generator = ArrivalGenerator::new(&config, 3).unwrap();
        for _ in 0..100 {
            let service = generator.next_service_times();
            assert!(service.prep >= 0.0 && service.operation >= 0.0 && service.recovery >= 0.0);
        }
    }

    #[test]
    fn test_rejects_non_positive_mean() {
        let config = SimulationConfig { mean_prep_time: 0.0, ..SimulationConfig::default() };
        let err = ArrivalGenerator::new(&config, 1).unwrap_err();
        assert!(matches!(err, SimulationError::DistributionError(_)));
    }
}
