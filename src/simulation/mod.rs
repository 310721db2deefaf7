//! Replications, statistics and study orchestration
//!
//! This module turns the surgical unit model into experiments: it runs seeded
//! replications, reduces them to metrics, aggregates across replications and
//! persists the results.
//!
//! # Overview
//!
//! - **ReplicationRunner**: one seeded, reproducible run of the unit
//! - **ReplicationMetrics**: per-replication performance record
//! - **AggregateSummary**: mean, spread and 95% confidence interval per metric
//! - **StudyRunner**: studies, paired comparisons, sensitivity sweeps
//! - **SimulationError**: error type shared by the whole crate
//! - **LoggingConfig**: tracing subscriber set-up
//!
//! # Usage Example
//!
//! ```rust
//! use surgical_flow_sim::simulation::*;
//! use surgical_flow_sim::types::*;
//!
//! let config = SimulationConfig::builder().num_replications(3).build().unwrap();
//! let result = StudyRunner::new().run_study(&config).unwrap();
//!
//! let blocking = result.summary.get("blocking_probability").unwrap();
//! assert_eq!(blocking.n, 3);
//! assert!(blocking.ci_lower <= blocking.mean && blocking.mean <= blocking.ci_upper);
//! ```

pub mod aggregate;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod output;
pub mod runner;
pub mod study;

// Re-export all public types for convenience
pub use aggregate::*;
pub use error::*;
pub use logging::*;
pub use metrics::*;
pub use output::*;
pub use runner::*;
pub use study::*;
