//! Flat-file persistence of study results
//!
//! The per-replication table is the hand-off format for downstream reporting:
//! one row per replication, one column per metric, missing values left empty
//! (CSV) or `null` (JSON).

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use super::aggregate::AggregateSummary;
use super::metrics::METRIC_NAMES;
use super::runner::ReplicationOutput;
use super::study::{PairedComparison, ReplicationRecord, StudyResult};
use crate::engine::SimTime;
use crate::simulation::SimulationResult;
use crate::types::{OutputFormat, SimulationConfig, StudyId};

const PATIENT_COLUMNS: [&str; 17] = [
    "replication_id",
    "patient_id",
    "arrival_time",
    "prep_duration",
    "operation_duration",
    "recovery_duration",
    "prep_start",
    "prep_end",
    "operation_start",
    "operation_end",
    "recovery_start",
    "recovery_end",
    "departure_time",
    "was_blocked",
    "blocking_duration",
    "recovery_busy_at_operation_end",
    "throughput_time",
];

fn cell(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => v.to_string(),
        _ => String::new(),
    }
}

fn time_cell(value: Option<SimTime>) -> String {
    cell(value.map(SimTime::minutes))
}

fn create<P: AsRef<Path>>(path: P) -> SimulationResult<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path)?))
}

/// Write one row per replication.
///
/// Degenerate replications keep their row with every metric cell empty.
pub fn write_replication_table<P: AsRef<Path>>(
    records: &[ReplicationRecord],
    path: P,
    format: OutputFormat,
) -> SimulationResult<()> {
    let path = path.as_ref();
    let mut writer = create(path)?;

    match format {
        OutputFormat::Csv => {
            writeln!(writer, "replication_id,{}", METRIC_NAMES.join(","))?;
            for record in records {
                let row = record.row().unwrap_or_default();
                let cells: Vec<String> =
                    METRIC_NAMES.iter().map(|name| cell(row.get(*name).copied())).collect();
                writeln!(writer, "{},{}", record.replication_id, cells.join(","))?;
            }
        }
        OutputFormat::Json => {
            let rows: Vec<Value> = records
                .iter()
                .map(|record| {
                    let row = record.row().unwrap_or_default();
                    let mut object = Map::new();
                    object.insert("replication_id".to_string(), Value::from(record.replication_id));
                    for name in METRIC_NAMES {
                        let value = row.get(name).copied().map(Value::from).unwrap_or(Value::Null);
                        object.insert(name.to_string(), value);
                    }
                    Value::Object(object)
                })
                .collect();
            serde_json::to_writer_pretty(&mut writer, &rows)?;
            writeln!(writer)?;
        }
    }

    writer.flush()?;
    info!("Wrote {} replication rows to {}", records.len(), path.display());
    Ok(())
}

/// Write every retained patient of every replication as CSV
pub fn write_patient_table<P: AsRef<Path>>(
    outputs: &[&ReplicationOutput],
    path: P,
) -> SimulationResult<()> {
    let path = path.as_ref();
    let mut writer = create(path)?;
    writeln!(writer, "{}", PATIENT_COLUMNS.join(","))?;

    let mut written = 0usize;
    for output in outputs {
        for patient in &output.completed_patients {
            let cells = [
                output.replication_id.to_string(),
                patient.id.raw().to_string(),
                patient.arrival_time.minutes().to_string(),
                patient.service.prep.to_string(),
                patient.service.operation.to_string(),
                patient.service.recovery.to_string(),
                time_cell(patient.prep_start),
                time_cell(patient.prep_end),
                time_cell(patient.operation_start),
                time_cell(patient.operation_end),
                time_cell(patient.recovery_start),
                time_cell(patient.recovery_end),
                time_cell(patient.departure_time),
                patient.was_blocked.to_string(),
                cell(patient.blocking_duration),
                patient.recovery_busy_at_operation_end.map(|n| n.to_string()).unwrap_or_default(),
                cell(patient.throughput_time()),
            ];
            writeln!(writer, "{}", cells.join(","))?;
            written += 1;
        }
    }

    writer.flush()?;
    info!("Wrote {} patient rows to {}", written, path.display());
    Ok(())
}

/// Summary document of one study
#[derive(Debug, Clone, Serialize)]
pub struct StudyReport<'a> {
    /// Unique id of this report
    pub study_id: StudyId,
    /// Creation instant
    pub generated_at: DateTime<Utc>,
    /// Scenario name derived from the capacities
    pub scenario: String,
    /// Configuration that was replicated
    pub config: &'a SimulationConfig,
    /// Replications run
    pub replications: usize,
    /// Replications without post-warmup completions
    pub degenerate_replications: usize,
    /// Cross-replication summary per metric
    pub metrics: &'a AggregateSummary,
}

impl<'a> StudyReport<'a> {
    /// Build a report for a finished study
    pub fn new(result: &'a StudyResult) -> Self {
        Self {
            study_id: StudyId::new(),
            generated_at: Utc::now(),
            scenario: result.config.scenario_name(),
            config: &result.config,
            replications: result.records.len(),
            degenerate_replications: result.degenerate_replications,
            metrics: &result.summary,
        }
    }
}

/// Summary document of a paired comparison
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport<'a> {
    /// Unique id of this report
    pub study_id: StudyId,
    /// Creation instant
    pub generated_at: DateTime<Utc>,
    /// Report of the first configuration
    pub first: StudyReport<'a>,
    /// Report of the second configuration
    pub second: StudyReport<'a>,
    /// Pairs contributing to the differences
    pub paired_replications: usize,
    /// Summary of `first - second` per metric
    pub differences: &'a AggregateSummary,
    /// Metrics whose difference interval excludes zero
    pub significant_metrics: Vec<&'a str>,
}

impl<'a> ComparisonReport<'a> {
    /// Build a report for a finished comparison
    pub fn new(comparison: &'a PairedComparison) -> Self {
        Self {
            study_id: StudyId::new(),
            generated_at: Utc::now(),
            first: StudyReport::new(&comparison.first),
            second: StudyReport::new(&comparison.second),
            paired_replications: comparison.differences.len(),
            differences: &comparison.difference_summary,
            significant_metrics: comparison
                .significant_metrics()
                .into_iter()
                .map(|(name, _)| name)
                .collect(),
        }
    }
}

fn write_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> SimulationResult<()> {
    let path = path.as_ref();
    let mut writer = create(path)?;
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    info!("Wrote summary to {}", path.display());
    Ok(())
}

/// Write a study's aggregate summary as JSON
pub fn write_summary_json<P: AsRef<Path>>(result: &StudyResult, path: P) -> SimulationResult<()> {
    write_json(&StudyReport::new(result), path)
}

/// Write a paired comparison's summaries as JSON
pub fn write_comparison_json<P: AsRef<Path>>(
    comparison: &PairedComparison,
    path: P,
) -> SimulationResult<()> {
    write_json(&ComparisonReport::new(comparison), path)
}
