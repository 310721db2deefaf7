//! Multi-replication studies
//!
//! A study runs every replication of a configuration, reduces each one to
//! metrics and aggregates them. Paired comparisons run two configurations on
//! the same seeds and aggregate the per-replication differences.

use serde::Serialize;
use tracing::{info, instrument, warn};

use super::aggregate::{aggregate_rows, AggregateSummary, MetricSummary};
use super::metrics::{MetricRow, ReplicationMetrics};
use super::runner::{ReplicationOutput, ReplicationRunner};
use crate::simulation::{SimulationError, SimulationResult};
use crate::types::{ConfigOverride, SimulationConfig};

/// One replication's contribution to a study
#[derive(Debug, Clone, Serialize)]
pub struct ReplicationRecord {
    /// Zero-based replication index
    pub replication_id: usize,
    /// Seed used for the replication
    pub seed: u64,
    /// Metrics, `None` when no patient completed after warmup
    pub metrics: Option<ReplicationMetrics>,
    /// Raw output, kept only when the runner was asked to
    #[serde(skip)]
    pub output: Option<ReplicationOutput>,
}

impl ReplicationRecord {
    /// Metric row, `None` for degenerate replications
    pub fn row(&self) -> Option<MetricRow> {
        self.metrics.as_ref().map(ReplicationMetrics::to_row)
    }

    /// Returns `true` if the replication produced no metrics
    pub fn is_degenerate(&self) -> bool {
        self.metrics.is_none()
    }
}

/// Outcome of running every replication of one configuration
#[derive(Debug, Clone, Serialize)]
pub struct StudyResult {
    /// Configuration that was replicated
    pub config: SimulationConfig,
    /// Per-replication records in index order
    pub records: Vec<ReplicationRecord>,
    /// Cross-replication summary of every metric
    pub summary: AggregateSummary,
    /// Replications without any post-warmup completion
    pub degenerate_replications: usize,
}

impl StudyResult {
    /// Metric rows of the non-degenerate replications
    pub fn rows(&self) -> Vec<MetricRow> {
        self.records.iter().filter_map(ReplicationRecord::row).collect()
    }

    /// Mean of one metric across replications
    pub fn mean_of(&self, name: &str) -> Option<f64> {
        self.summary.get(name).map(|s| s.mean)
    }

    /// Raw outputs, if the study kept them
    pub fn outputs(&self) -> Vec<&ReplicationOutput> {
        self.records.iter().filter_map(|r| r.output.as_ref()).collect()
    }
}

/// Two configurations run under common random numbers
#[derive(Debug, Clone, Serialize)]
pub struct PairedComparison {
    /// Study of the first configuration
    pub first: StudyResult,
    /// Study of the second configuration
    pub second: StudyResult,
    /// Per-replication `first - second` differences, keyed by index
    pub differences: Vec<(usize, MetricRow)>,
    /// Aggregate of the differences
    pub difference_summary: AggregateSummary,
}

impl PairedComparison {
    /// Metrics whose difference interval excludes zero, with their summaries
    pub fn significant_metrics(&self) -> Vec<(&str, &MetricSummary)> {
        self.difference_summary.iter().filter(|(_, summary)| summary.is_significant()).collect()
    }
}

/// One variant of a sensitivity analysis
#[derive(Debug, Clone, Serialize)]
pub struct SensitivityEntry {
    /// Change applied to the base configuration
    pub change: ConfigOverride,
    /// Study of the changed configuration
    pub result: StudyResult,
}

/// Studies of a base configuration under single-field changes
#[derive(Debug, Clone, Serialize)]
pub struct SensitivityResult {
    /// One entry per requested change, in request order
    pub entries: Vec<SensitivityEntry>,
}

impl SensitivityResult {
    /// `(change, mean)` pairs of one metric
    pub fn series(&self, metric: &str) -> Vec<(ConfigOverride, Option<f64>)> {
        self.entries.iter().map(|e| (e.change, e.result.mean_of(metric))).collect()
    }
}

/// Named scenario studies
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioComparison {
    /// Scenario name and study, in request order
    pub scenarios: Vec<(String, StudyResult)>,
}

impl ScenarioComparison {
    /// Study of a named scenario
    pub fn get(&self, name: &str) -> Option<&StudyResult> {
        self.scenarios.iter().find(|(n, _)| n == name).map(|(_, result)| result)
    }
}

/// Runs studies, comparisons and sweeps
#[derive(Debug, Clone)]
pub struct StudyRunner {
    keep_outputs: bool,
    progress_every: usize,
}

impl StudyRunner {
    /// Create a runner that discards raw outputs after reducing them
    pub fn new() -> Self {
        Self { keep_outputs: false, progress_every: 10 }
    }

    /// Keep each replication's raw output in its record
    pub fn with_outputs(mut self, keep: bool) -> Self {
        self.keep_outputs = keep;
        self
    }

    /// Log progress every `every` replications (0 disables)
    pub fn with_progress_every(mut self, every: usize) -> Self {
        self.progress_every = every;
        self
    }

    /// Run `config.num_replications` replications and aggregate them
    #[instrument(skip(self, config), fields(scenario = %config.scenario_name()))]
    pub fn run_study(&self, config: &SimulationConfig) -> SimulationResult<StudyResult> {
        let runner = ReplicationRunner::new(config.clone())?;
        let seeds: Vec<u64> = (0..config.num_replications).map(|i| config.seed_for(i)).collect();
        self.run_seeded(&runner, &seeds)
    }

    fn run_seeded(&self, runner: &ReplicationRunner, seeds: &[u64]) -> SimulationResult<StudyResult> {
        let config = runner.config();
        info!("Running {} replications of {}", seeds.len(), config.scenario_name());

        let mut records = Vec::with_capacity(seeds.len());
        for (index, &seed) in seeds.iter().enumerate() {
            let output = runner.run_with_seed(index, seed)?;
            let metrics = ReplicationMetrics::from_output(&output, config);
            records.push(ReplicationRecord {
                replication_id: index,
                seed,
                metrics,
                output: if self.keep_outputs { Some(output) } else { None },
            });

            if self.progress_every > 0 && (index + 1) % self.progress_every == 0 {
                info!("Completed {}/{} replications", index + 1, seeds.len());
            }
        }

        let degenerate_replications = records.iter().filter(|r| r.is_degenerate()).count();
        if degenerate_replications > 0 {
            warn!(
                "{} of {} replications had no completed patients after warmup",
                degenerate_replications,
                records.len()
            );
        }

        let rows: Vec<MetricRow> = records.iter().filter_map(ReplicationRecord::row).collect();
        let summary = aggregate_rows(&rows);

        Ok(StudyResult { config: config.clone(), records, summary, degenerate_replications })
    }

    /// Run both configurations `replications` times on the seeds of `first`
    #[instrument(skip(self, first, second))]
    pub fn run_paired_comparison(
        &self,
        first: &SimulationConfig,
        second: &SimulationConfig,
        replications: usize,
    ) -> SimulationResult<PairedComparison> {
        if replications == 0 {
            return Err(SimulationError::configuration_error(
                "paired comparison needs at least one replication",
            ));
        }

        let seeds: Vec<u64> = (0..replications).map(|i| first.seed_for(i)).collect();
        info!(
            "Paired comparison {} vs {} over {} replications",
            first.scenario_name(),
            second.scenario_name(),
            replications
        );

        let first_result = self.run_seeded(&ReplicationRunner::new(first.clone())?, &seeds)?;
        let second_result = self.run_seeded(&ReplicationRunner::new(second.clone())?, &seeds)?;

        let differences: Vec<(usize, MetricRow)> = first_result
            .records
            .iter()
            .zip(&second_result.records)
            .filter_map(|(a, b)| {
                let (a_row, b_row) = (a.row()?, b.row()?);
                let diff: MetricRow = a_row
                    .iter()
                    .filter_map(|(name, a_value)| {
                        b_row.get(name).map(|b_value| (name.clone(), a_value - b_value))
                    })
                    .collect();
                Some((a.replication_id, diff))
            })
            .collect();

        let rows: Vec<MetricRow> = differences.iter().map(|(_, row)| row.clone()).collect();
        let difference_summary = aggregate_rows(&rows);

        Ok(PairedComparison {
            first: first_result,
            second: second_result,
            differences,
            difference_summary,
        })
    }

    /// Study the base configuration under each change separately
    pub fn run_sensitivity(
        &self,
        base: &SimulationConfig,
        changes: &[ConfigOverride],
    ) -> SimulationResult<SensitivityResult> {
        let mut entries = Vec::with_capacity(changes.len());
        for &change in changes {
            info!("Sensitivity run with {}", change);
            let config = base.with_override(change)?;
            entries.push(SensitivityEntry { change, result: self.run_study(&config)? });
        }
        Ok(SensitivityResult { entries })
    }

    /// Study each named configuration
    pub fn compare_scenarios(
        &self,
        scenarios: &[(String, SimulationConfig)],
    ) -> SimulationResult<ScenarioComparison> {
        let mut results = Vec::with_capacity(scenarios.len());
        for (name, config) in scenarios {
            info!("Running scenario {}", name);
            results.push((name.clone(), self.run_study(config)?));
        }
        Ok(ScenarioComparison { scenarios: results })
    }
}

impl Default for StudyRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SimulationConfig {
        SimulationConfig::builder().num_replications(4).build().unwrap()
    }

    #[test]
    fn test_study_has_one_record_per_replication() {
        let config = small_config();
        let result = StudyRunner::new().run_study(&config).unwrap();

        assert_eq!(result.records.len(), 4);
        assert_eq!(result.degenerate_replications, 0);
        for (i, record) in result.records.iter().enumerate() {
            assert_eq!(record.replication_id, i);
            assert_eq!(record.seed, 42 + i as u64);
            assert!(record.output.is_none());
        }
        assert_eq!(result.summary.get("blocking_probability").unwrap().n, 4);
        assert!(result.mean_of("num_patients_arrived").unwrap() > 0.0);
    }

    #[test]
    fn test_outputs_kept_on_request() {
        let config = small_config();
        let result = StudyRunner::new().with_outputs(true).run_study(&config).unwrap();
        assert_eq!(result.outputs().len(), 4);
    }

    #[test]
    fn test_degenerate_replications_counted() {
        let config = SimulationConfig::builder()
            .mean_interarrival(10_000.0)
            .sim_duration(100.0)
            .warmup_period(99.0)
            .num_replications(3)
            .build()
            .unwrap();
        let result = StudyRunner::new().run_study(&config).unwrap();

        assert_eq!(result.degenerate_replications, 3);
        assert!(result.summary.is_empty());
        assert!(result.rows().is_empty());
    }

    #[test]
    fn test_identical_configs_show_no_difference() {
        let config = small_config();
        let comparison = StudyRunner::new().run_paired_comparison(&config, &config, 4).unwrap();

        assert_eq!(comparison.differences.len(), 4);
        assert!(comparison.significant_metrics().is_empty());
        let diff = comparison.difference_summary.get("mean_throughput_time").unwrap();
        assert_eq!(diff.mean, 0.0);
        assert_eq!(diff.std, 0.0);
    }

    #[test]
    fn test_paired_runs_share_seeds() {
        let first = small_config();
        let second = first.with_override(ConfigOverride::RecoveryRooms(5)).unwrap();
        let comparison = StudyRunner::new().run_paired_comparison(&first, &second, 3).unwrap();

        for (a, b) in comparison.first.records.iter().zip(&comparison.second.records) {
            assert_eq!(a.seed, b.seed);
        }
        // Same arrivals under common random numbers
        let arrivals = comparison.difference_summary.get("num_patients_arrived").unwrap();
        assert_eq!(arrivals.max, 0.0);
        assert_eq!(arrivals.min, 0.0);
    }

    #[test]
    fn test_zero_replication_comparison_rejected() {
        let config = small_config();
        assert!(StudyRunner::new().run_paired_comparison(&config, &config, 0).is_err());
    }

    #[test]
    fn test_sensitivity_applies_each_change() {
        let base = SimulationConfig::builder().num_replications(2).build().unwrap();
        let changes = [ConfigOverride::RecoveryRooms(1), ConfigOverride::RecoveryRooms(4)];
        let result = StudyRunner::new().run_sensitivity(&base, &changes).unwrap();

        assert_eq!(result.entries.len(), 2);
        assert_eq!(result.entries[0].result.config.num_recovery_rooms, 1);
        assert_eq!(result.entries[1].result.config.num_recovery_rooms, 4);
        assert_eq!(result.series("blocking_probability").len(), 2);
    }

    #[test]
    fn test_invalid_sensitivity_change_rejected() {
        let base = small_config();
        let result = StudyRunner::new().run_sensitivity(&base, &[ConfigOverride::PrepRooms(0)]);
        assert!(matches!(result, Err(SimulationError::ConfigurationError(_))));
    }

    #[test]
    fn test_scenarios_keep_names_and_order() {
        let base = SimulationConfig::builder().num_replications(2).build().unwrap();
        let scenarios = vec![
            ("tight".to_string(), base.with_override(ConfigOverride::RecoveryRooms(1)).unwrap()),
            ("roomy".to_string(), base.with_override(ConfigOverride::RecoveryRooms(6)).unwrap()),
        ];
        let comparison = StudyRunner::new().compare_scenarios(&scenarios).unwrap();

        assert_eq!(comparison.scenarios[0].0, "tight");
        assert_eq!(comparison.get("roomy").unwrap().config.num_recovery_rooms, 6);
        assert!(comparison.get("missing").is_none());
    }
}
