//! Surgical Flow Simulator
//!
//! A discrete-event simulation of patients moving through a surgical unit:
//! preparation, operation, then recovery, with finite capacity at every stage.
//!
//! # Overview
//!
//! The model's central effect is theatre blocking: a patient whose operation
//! ends while every recovery bed is occupied keeps the theatre until a bed
//! frees up. The library estimates how often that happens and what it costs,
//! across many independent seeded replications.
//!
//! ## Key Features
//!
//! - **Deterministic Scheduler**: time-ordered events with FIFO tie-break
//! - **Resource Pools**: capacity-limited pools with FIFO wait tickets
//! - **Patient State Machine**: explicit continuation-passing patient flow
//! - **Reproducible Replications**: replication `i` is seeded with `seed + i`
//! - **Statistics**: per-metric mean, spread and 95% Student-t intervals
//! - **Paired Comparison**: common random numbers across two configurations
//!
//! ## Quick Start
//!
//! ```rust
//! use surgical_flow_sim::*;
//!
//! let config = SimulationConfig::builder().num_replications(5).build()?;
//! let result = StudyRunner::new().run_study(&config)?;
//!
//! let throughput = result.summary.get("mean_throughput_time").unwrap();
//! println!("Mean time in system: {:.1} min", throughput.mean);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Module Organization
//!
//! - [`types`]: Identifiers, enums and configuration
//! - [`engine`]: Simulated clock, scheduler and resource pools
//! - [`hospital`]: Patients, their process, arrivals and the monitor
//! - [`simulation`]: Replications, metrics, aggregation and output
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │   Types     │    │   Engine    │    │  Hospital   │
//! │             │    │             │    │             │
//! │ Identifiers │◄───┤ Scheduler   │◄───┤ Patients    │
//! │ Enums       │    │ Pools       │    │ Arrivals    │
//! │ Config      │    │ Clock       │    │ Monitor     │
//! └─────────────┘    └─────────────┘    └─────────────┘
//!        ▲                                      ▲
//!        │                                      │
//!        │           ┌─────────────┐            │
//!        └───────────┤ Simulation  ├────────────┘
//!                    │             │
//!                    │ Runner      │
//!                    │ Statistics  │
//!                    │ Output      │
//!                    └─────────────┘
//! ```
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]

// Module declarations
pub mod engine;
pub mod hospital;
pub mod simulation;

pub mod types;

// Core types and identifiers
pub use types::{
    // Configuration
    ConfigOverride,
    ConfigValidationError,
    OutputFormat,
    // Identifiers
    PatientId,
    // Enums
    PoolKind,
    ScenarioPreset,
    SimulationConfig,
    StudyId,
};

// Engine
pub use engine::{Process, ResourcePool, Scheduler, SimTime, Ticket};

// Hospital model
pub use hospital::{HospitalSystem, Patient, PatientProcess, PatientState};

// Simulation types and functionality
pub use simulation::{
    AggregateSummary, MetricSummary, PairedComparison, ReplicationMetrics, ReplicationOutput,
    ReplicationRunner, SimulationError, SimulationResult, StudyResult, StudyRunner,
};
