//! Per-replication performance metrics
//!
//! Reduces one [`ReplicationOutput`] to a flat record of named values. Values
//! that are undefined for a replication (no blocked patient, no monitor
//! sample) are `None` and left out of the metric row.

use serde::Serialize;
use std::collections::BTreeMap;

use super::aggregate::{max, mean, median, min, std_dev};
use super::runner::ReplicationOutput;
use crate::hospital::{Patient, PoolSample};
use crate::types::{PoolKind, SimulationConfig};

/// Metric name to value, for one replication or one paired difference
pub type MetricRow = BTreeMap<String, f64>;

/// Column order of the per-replication table
pub const METRIC_NAMES: [&str; 29] = [
    "mean_throughput_time",
    "std_throughput_time",
    "median_throughput_time",
    "min_throughput_time",
    "max_throughput_time",
    "blocking_probability",
    "num_blocking_events",
    "theatre_blocked_time",
    "theatre_blocked_fraction",
    "all_recovery_busy_probability",
    "num_patients_completed",
    "num_patients_arrived",
    "mean_wait_prep",
    "max_wait_prep",
    "mean_wait_operation",
    "max_wait_operation",
    "mean_wait_recovery",
    "max_wait_recovery",
    "mean_prep_queue",
    "max_prep_queue",
    "mean_prep_utilization",
    "mean_theatre_queue",
    "max_theatre_queue",
    "mean_theatre_utilization",
    "mean_recovery_queue",
    "max_recovery_queue",
    "mean_recovery_utilization",
    "mean_blocking_duration",
    "max_blocking_duration",
];

/// Queue and utilization statistics of one pool's samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PoolMetrics {
    /// Mean sampled queue length
    pub mean_queue: f64,
    /// Largest sampled queue length
    pub max_queue: f64,
    /// Mean sampled utilization
    pub mean_utilization: f64,
}

impl PoolMetrics {
    fn from_samples(samples: &[PoolSample]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let queues: Vec<f64> = samples.iter().map(|s| s.queue_length as f64).collect();
        let utilization: Vec<f64> = samples.iter().map(|s| s.utilization).collect();
        Some(Self { mean_queue: mean(&queues), max_queue: max(&queues), mean_utilization: mean(&utilization) })
    }
}

/// Mean and maximum of an optional per-patient quantity
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeanMax {
    /// Mean over patients with a value
    pub mean: f64,
    /// Maximum over patients with a value
    pub max: f64,
}

impl MeanMax {
    fn over<F>(patients: &[Patient], value: F) -> Option<Self>
    where
        F: Fn(&Patient) -> Option<f64>,
    {
        let values: Vec<f64> = patients.iter().filter_map(value).collect();
        if values.is_empty() {
            None
        } else {
            Some(Self { mean: mean(&values), max: max(&values) })
        }
    }
}

/// Performance metrics of one replication
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplicationMetrics {
    /// Zero-based replication index
    pub replication_id: usize,
    /// Mean time in system of retained patients
    pub mean_throughput_time: f64,
    /// Population standard deviation of time in system
    pub std_throughput_time: f64,
    /// Median time in system
    pub median_throughput_time: f64,
    /// Shortest time in system
    pub min_throughput_time: f64,
    /// Longest time in system
    pub max_throughput_time: f64,
    /// Fraction of retained patients that were blocked
    pub blocking_probability: f64,
    /// Retained patients that were blocked
    pub num_blocking_events: usize,
    /// Theatre blocked time over the whole run
    pub theatre_blocked_time: f64,
    /// Blocked time divided by the observation window
    pub theatre_blocked_fraction: f64,
    /// Fraction of monitor samples with every recovery bed busy
    pub all_recovery_busy_probability: f64,
    /// Patients retained after warmup
    pub num_patients_completed: usize,
    /// Patients that arrived over the whole run
    pub num_patients_arrived: u64,
    /// Wait for a preparation room
    pub wait_prep: Option<MeanMax>,
    /// Wait for a theatre after preparation
    pub wait_operation: Option<MeanMax>,
    /// Wait for a recovery bed after the operation
    pub wait_recovery: Option<MeanMax>,
    /// Preparation room samples
    pub prep: Option<PoolMetrics>,
    /// Theatre samples
    pub theatre: Option<PoolMetrics>,
    /// Recovery bed samples
    pub recovery: Option<PoolMetrics>,
    /// Blocking durations of retained blocked patients
    pub blocking_duration: Option<MeanMax>,
}

impl ReplicationMetrics {
    /// Reduce a replication's output.
    ///
    /// Returns `None` when no patient departed after warmup; such a
    /// replication has no defined throughput or blocking probability.
    pub fn from_output(output: &ReplicationOutput, config: &SimulationConfig) -> Option<Self> {
        let patients = &output.completed_patients;
        if patients.is_empty() {
            return None;
        }

        let throughput: Vec<f64> = patients.iter().filter_map(Patient::throughput_time).collect();
        if throughput.is_empty() {
            return None;
        }

        let completed = patients.len();
        let blocked = patients.iter().filter(|p| p.was_blocked).count();
        let window = config.observation_window();

        Some(Self {
            replication_id: output.replication_id,
            mean_throughput_time: mean(&throughput),
            std_throughput_time: std_dev(&throughput, 0),
            median_throughput_time: median(&throughput),
            min_throughput_time: min(&throughput),
            max_throughput_time: max(&throughput),
            blocking_probability: blocked as f64 / completed as f64,
            num_blocking_events: blocked,
            theatre_blocked_time: output.theatre_blocked_time,
            theatre_blocked_fraction: if window > 0.0 {
                output.theatre_blocked_time / window
            } else {
                0.0
            },
            all_recovery_busy_probability: if output.monitor_ticks > 0 {
                output.recovery_saturated_ticks as f64 / output.monitor_ticks as f64
            } else {
                0.0
            },
            num_patients_completed: completed,
            num_patients_arrived: output.total_arrived,
            wait_prep: MeanMax::over(patients, Patient::wait_for_prep),
            wait_operation: MeanMax::over(patients, Patient::wait_for_operation),
            wait_recovery: MeanMax::over(patients, Patient::wait_for_recovery),
            prep: PoolMetrics::from_samples(output.samples(PoolKind::Preparation)),
            theatre: PoolMetrics::from_samples(output.samples(PoolKind::Theatre)),
            recovery: PoolMetrics::from_samples(output.samples(PoolKind::Recovery)),
            blocking_duration: MeanMax::over(patients, |p| {
                if p.was_blocked {
                    p.blocking_duration
                } else {
                    None
                }
            }),
        })
    }

    fn pool(&self, kind: PoolKind) -> Option<&PoolMetrics> {
        match kind {
            PoolKind::Preparation => self.prep.as_ref(),
            PoolKind::Theatre => self.theatre.as_ref(),
            PoolKind::Recovery => self.recovery.as_ref(),
        }
    }

    /// Flatten into named values; undefined metrics are absent
    pub fn to_row(&self) -> MetricRow {
        let mut row = MetricRow::new();
        let mut put = |name: &str, value: f64| {
            row.insert(name.to_string(), value);
        };

        put("mean_throughput_time", self.mean_throughput_time);
        put("std_throughput_time", self.std_throughput_time);
        put("median_throughput_time", self.median_throughput_time);
        put("min_throughput_time", self.min_throughput_time);
        put("max_throughput_time", self.max_throughput_time);
        put("blocking_probability", self.blocking_probability);
        put("num_blocking_events", self.num_blocking_events as f64);
        put("theatre_blocked_time", self.theatre_blocked_time);
        put("theatre_blocked_fraction", self.theatre_blocked_fraction);
        put("all_recovery_busy_probability", self.all_recovery_busy_probability);
        put("num_patients_completed", self.num_patients_completed as f64);
        put("num_patients_arrived", self.num_patients_arrived as f64);

        for (label, wait) in [
            ("prep", self.wait_prep),
            ("operation", self.wait_operation),
            ("recovery", self.wait_recovery),
        ] {
            if let Some(wait) = wait {
                put(&format!("mean_wait_{}", label), wait.mean);
                put(&format!("max_wait_{}", label), wait.max);
            }
        }

        for kind in PoolKind::ALL {
            if let Some(pool) = self.pool(kind) {
                let prefix = kind.metric_prefix();
                put(&format!("mean_{}_queue", prefix), pool.mean_queue);
                put(&format!("max_{}_queue", prefix), pool.max_queue);
                put(&format!("mean_{}_utilization", prefix), pool.mean_utilization);
            }
        }

        if let Some(blocking) = self.blocking_duration {
            put("mean_blocking_duration", blocking.mean);
            put("max_blocking_duration", blocking.max);
        }

        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SimTime;
    use crate::hospital::ServiceTimes;
    use crate::types::PatientId;

    fn t(minutes: f64) -> SimTime {
        SimTime::new(minutes).unwrap()
    }

    fn patient(id: u64, arrival: f64, departure: f64, blocked_for: Option<f64>) -> Patient {
        let mut p = Patient::new(PatientId::new(id), t(arrival), ServiceTimes::new(1.0, 1.0, 1.0));
        p.prep_start = Some(t(arrival + 1.0));
        p.prep_end = Some(t(arrival + 2.0));
        p.operation_start = Some(t(arrival + 4.0));
        p.operation_end = Some(t(arrival + 5.0));
        let recovery_start = arrival + 5.0 + blocked_for.unwrap_or(0.0);
        if let Some(duration) = blocked_for {
            p.was_blocked = true;
            p.blocking_start = Some(t(arrival + 5.0));
            p.blocking_end = Some(t(recovery_start));
            p.blocking_duration = Some(duration);
        }
        p.recovery_start = Some(t(recovery_start));
        p.recovery_end = Some(t(departure));
        p.departure_time = Some(t(departure));
        p
    }

    fn sample(queue: usize, in_use: usize, capacity: usize) -> PoolSample {
        PoolSample {
            time: t(600.0),
            queue_length: queue,
            in_use,
            utilization: in_use as f64 / capacity as f64,
        }
    }

    fn output(patients: Vec<Patient>) -> ReplicationOutput {
        ReplicationOutput {
            replication_id: 2,
            seed: 44,
            completed_patients: patients,
            prep_samples: vec![sample(0, 1, 3), sample(2, 3, 3)],
            theatre_samples: vec![sample(1, 1, 1), sample(3, 1, 1)],
            recovery_samples: vec![sample(0, 3, 3), sample(0, 2, 3)],
            monitor_ticks: 2,
            recovery_saturated_ticks: 1,
            total_arrived: 10,
            total_departed: 8,
            num_blocking_events: 3,
            theatre_blocked_time: 96.0,
            blocking_episodes: Vec::new(),
            events_processed: 100,
        }
    }

    #[test]
    fn test_no_completions_is_undefined() {
        let config = SimulationConfig::default();
        assert!(ReplicationMetrics::from_output(&output(Vec::new()), &config).is_none());
    }

    #[test]
    fn test_metrics_from_known_output() {
        let config = SimulationConfig::default();
        let patients = vec![
            patient(1, 500.0, 520.0, None),
            patient(2, 510.0, 550.0, Some(10.0)),
            patient(3, 530.0, 560.0, None),
            patient(4, 540.0, 600.0, Some(30.0)),
        ];
        let metrics = ReplicationMetrics::from_output(&output(patients), &config).unwrap();

        // throughput 20, 40, 30, 60
        assert_eq!(metrics.mean_throughput_time, 37.5);
        assert_eq!(metrics.median_throughput_time, 35.0);
        assert_eq!(metrics.min_throughput_time, 20.0);
        assert_eq!(metrics.max_throughput_time, 60.0);
        assert!((metrics.std_throughput_time - 218.75_f64.sqrt()).abs() < 1e-9);

        assert_eq!(metrics.blocking_probability, 0.5);
        assert_eq!(metrics.num_blocking_events, 2);
        assert_eq!(metrics.theatre_blocked_time, 96.0);
        assert_eq!(metrics.theatre_blocked_fraction, 0.1);
        assert_eq!(metrics.all_recovery_busy_probability, 0.5);
        assert_eq!(metrics.num_patients_completed, 4);
        assert_eq!(metrics.num_patients_arrived, 10);

        let blocking = metrics.blocking_duration.unwrap();
        assert_eq!(blocking.mean, 20.0);
        assert_eq!(blocking.max, 30.0);

        let theatre = metrics.theatre.unwrap();
        assert_eq!(theatre.mean_queue, 2.0);
        assert_eq!(theatre.max_queue, 3.0);
        assert_eq!(theatre.mean_utilization, 1.0);
    }

    #[test]
    fn test_row_omits_undefined_metrics() {
        let config = SimulationConfig::default();
        let metrics =
            ReplicationMetrics::from_output(&output(vec![patient(1, 500.0, 520.0, None)]), &config)
                .unwrap();
        let row = metrics.to_row();

        assert!(!row.contains_key("mean_blocking_duration"));
        assert!(!row.contains_key("replication_id"));
        assert_eq!(row["blocking_probability"], 0.0);
        assert_eq!(row["mean_wait_prep"], 1.0);
        assert_eq!(row["mean_wait_operation"], 2.0);
        assert_eq!(row["mean_wait_recovery"], 0.0);
        assert_eq!(row.len(), METRIC_NAMES.len() - 2);
        assert!(row.keys().all(|name| METRIC_NAMES.contains(&name.as_str())));
    }
}
