//! Cross-replication aggregation
//!
//! Each metric column is summarized independently: missing and NaN values
//! are dropped per column, then mean, sample standard deviation, extremes,
//! median and a 95% Student-t confidence interval are computed.

use serde::Serialize;
use std::collections::BTreeMap;

use super::metrics::MetricRow;

/// Two-sided 95% critical values of Student's t for 1..=30 degrees of freedom
const T_TABLE_95: [f64; 30] = [
    12.706204736,
    4.302652730,
    3.182446305,
    2.776445105,
    2.570581836,
    2.446911851,
    2.364624252,
    2.306004135,
    2.262157163,
    2.228138852,
    2.200985160,
    2.178812830,
    2.160368656,
    2.144786688,
    2.131449546,
    2.119905299,
    2.109815578,
    2.100922040,
    2.093024054,
    2.085963447,
    2.079613845,
    2.073873068,
    2.068657610,
    2.063898562,
    2.059538553,
    2.055529439,
    2.051830516,
    2.048407142,
    2.045229642,
    2.042272456,
];

/// 97.5% quantile of the standard normal
const Z_975: f64 = 1.959963985;

/// Two-sided 95% critical value of Student's t with `df` degrees of freedom.
///
/// Exact to nine decimals up to 30 degrees of freedom; beyond that a
/// fourth-order Cornish-Fisher expansion around the normal quantile, accurate
/// to better than 1e-7. Returns NaN for `df == 0`.
pub fn t_critical_95(df: usize) -> f64 {
    match df {
        0 => f64::NAN,
        1..=30 => T_TABLE_95[df - 1],
        _ => {
            let v = df as f64;
            let z = Z_975;
            let z2 = z * z;
            let g1 = (z2 + 1.0) * z / 4.0;
            let g2 = ((5.0 * z2 + 16.0) * z2 + 3.0) * z / 96.0;
            let g3 = (((3.0 * z2 + 19.0) * z2 + 17.0) * z2 - 15.0) * z / 384.0;
            let g4 =
                ((((79.0 * z2 + 776.0) * z2 + 1482.0) * z2 - 1920.0) * z2 - 945.0) * z / 92160.0;
            z + g1 / v + g2 / (v * v) + g3 / (v * v * v) + g4 / (v * v * v * v)
        }
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with `ddof` delta degrees of freedom (NaN if too few values)
pub(crate) fn std_dev(values: &[f64], ddof: usize) -> f64 {
    if values.len() <= ddof {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / (values.len() - ddof) as f64).sqrt()
}

/// Median, averaging the two middle values for even lengths
pub(crate) fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n == 0 {
        f64::NAN
    } else if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

pub(crate) fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

pub(crate) fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Summary statistics of one metric across replications.
///
/// With a single observation `std`, `ci_lower` and `ci_upper` are NaN, which
/// serializes as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSummary {
    /// Sample mean
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub std: f64,
    /// Smallest observation
    pub min: f64,
    /// Largest observation
    pub max: f64,
    /// Median observation
    pub median: f64,
    /// Lower bound of the 95% confidence interval for the mean
    pub ci_lower: f64,
    /// Upper bound of the 95% confidence interval for the mean
    pub ci_upper: f64,
    /// Number of non-missing observations
    pub n: usize,
}

impl MetricSummary {
    /// Summarize a column; NaN entries are dropped. `None` if nothing remains.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let data: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if data.is_empty() {
            return None;
        }

        let n = data.len();
        let mean = mean(&data);
        let std = std_dev(&data, 1);
        let margin = t_critical_95(n - 1) * std / (n as f64).sqrt();

        Some(Self {
            mean,
            std,
            min: min(&data),
            max: max(&data),
            median: median(&data),
            ci_lower: mean - margin,
            ci_upper: mean + margin,
            n,
        })
    }

    /// Half the width of the confidence interval
    pub fn half_width(&self) -> f64 {
        (self.ci_upper - self.ci_lower) / 2.0
    }

    /// Returns `true` if `value` lies inside the confidence interval
    pub fn contains(&self, value: f64) -> bool {
        self.ci_lower <= value && value <= self.ci_upper
    }

    /// Returns `true` if the confidence interval excludes zero
    pub fn is_significant(&self) -> bool {
        self.ci_lower > 0.0 || self.ci_upper < 0.0
    }
}

/// Per-metric summaries, keyed by metric name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AggregateSummary {
    metrics: BTreeMap<String, MetricSummary>,
}

impl AggregateSummary {
    /// Summary of one metric
    pub fn get(&self, name: &str) -> Option<&MetricSummary> {
        self.metrics.get(name)
    }

    /// All summaries in metric-name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricSummary)> {
        self.metrics.iter().map(|(name, summary)| (name.as_str(), summary))
    }

    /// Number of summarized metrics
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Returns `true` if no metric had any observation
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// Summarize every metric column present in `rows`
pub fn aggregate_rows(rows: &[MetricRow]) -> AggregateSummary {
    let mut columns: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for row in rows {
        for (name, value) in row {
            columns.entry(name.as_str()).or_default().push(*value);
        }
    }

    let metrics = columns
        .into_iter()
        .filter_map(|(name, values)| {
            MetricSummary::from_values(&values).map(|summary| (name.to_string(), summary))
        })
        .collect();

    AggregateSummary { metrics }
}
