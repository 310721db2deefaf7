//! Tests for cross-replication aggregation and paired differences

use surgical_flow_sim::simulation::{
    aggregate_rows, t_critical_95, MetricRow, MetricSummary, StudyRunner, METRIC_NAMES,
};
use surgical_flow_sim::types::SimulationConfig;

fn row(pairs: &[(&str, f64)]) -> MetricRow {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[test]
fn test_known_interval() {
    let summary = MetricSummary::from_values(&[10.0, 12.0, 11.0, 13.0, 9.0]).unwrap();
    assert_eq!(summary.mean, 11.0);
    assert_eq!(summary.median, 11.0);
    assert!(summary.contains(11.0));
    assert!(summary.ci_upper - summary.ci_lower > 0.0);

    let expected = t_critical_95(4) * summary.std / 5f64.sqrt();
    assert!((summary.half_width() - expected).abs() < 1e-12);
}

#[test]
fn test_interval_narrows_as_replications_grow() {
    let pattern = [10.0, 12.0, 11.0, 13.0, 9.0];
    let widths: Vec<f64> = [5, 10, 20, 40, 80]
        .iter()
        .map(|&n| {
            let values: Vec<f64> = pattern.iter().copied().cycle().take(n).collect();
            MetricSummary::from_values(&values).unwrap().half_width()
        })
        .collect();
    assert!(widths.windows(2).all(|w| w[1] < w[0]), "{:?}", widths);
}

#[test]
fn test_missing_metric_excluded_per_column() {
    let rows = vec![
        row(&[("blocking_probability", 0.2), ("mean_blocking_duration", 12.0)]),
        row(&[("blocking_probability", 0.0)]),
        row(&[("blocking_probability", 0.4), ("mean_blocking_duration", f64::NAN)]),
    ];
    let summary = aggregate_rows(&rows);

    let blocking = summary.get("blocking_probability").unwrap();
    assert_eq!(blocking.n, 3);
    assert!((blocking.mean - 0.2).abs() < 1e-12);

    let duration = summary.get("mean_blocking_duration").unwrap();
    assert_eq!(duration.n, 1);
    assert!(duration.ci_lower.is_nan());
}

#[test]
fn test_study_summary_covers_table_metrics() {
    let config = SimulationConfig::builder().num_recovery_rooms(1).num_replications(5).build().unwrap();
    let result = StudyRunner::new().run_study(&config).unwrap();

    // A congested unit defines every metric in every replication
    for name in METRIC_NAMES {
        let summary = result.summary.get(name).unwrap_or_else(|| panic!("missing {}", name));
        assert_eq!(summary.n, 5, "{}", name);
        assert!(summary.min <= summary.median && summary.median <= summary.max, "{}", name);
        assert!(summary.ci_lower <= summary.mean && summary.mean <= summary.ci_upper, "{}", name);
    }
}

#[test]
fn test_paired_differences_match_per_replication_rows() {
    let first = SimulationConfig::builder().num_recovery_rooms(1).build().unwrap();
    let second = SimulationConfig::builder().num_recovery_rooms(3).build().unwrap();
    let comparison = StudyRunner::new().run_paired_comparison(&first, &second, 6).unwrap();

    for (index, diff) in &comparison.differences {
        let a = comparison.first.records[*index].row().unwrap();
        let b = comparison.second.records[*index].row().unwrap();
        for (name, value) in diff {
            assert!((value - (a[name] - b[name])).abs() < 1e-12, "{}", name);
        }
    }

    let diffs: Vec<f64> = comparison
        .differences
        .iter()
        .map(|(_, d)| d["mean_throughput_time"])
        .collect();
    let direct = MetricSummary::from_values(&diffs).unwrap();
    assert_eq!(comparison.difference_summary.get("mean_throughput_time"), Some(&direct));
}
