//! Core types and identifiers for the surgical flow simulator
//!
//! This module contains fundamental types, identifiers, and configuration structures
//! used throughout the simulation system.
//!
//! # Overview
//!
//! - **Identifiers**: per-replication patient ids and UUID-based study ids
//! - **Enums**: pool kinds, output formats and scenario presets
//! - **Configuration**: immutable simulation configuration with validation and CLI support
//!
//! # Usage Example
//!
//! ```rust
//! use surgical_flow_sim::types::*;
//!
//! let config = SimulationConfig::builder()
//!     .num_recovery_rooms(5)
//!     .num_replications(10)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.scenario_name(), "P3_T1_R5");
//!
//! let variant = config.with_override(ConfigOverride::RecoveryRooms(1)).unwrap();
//! assert_eq!(variant.capacity_of(PoolKind::Recovery), 1);
//! ```

pub mod config;
pub mod enums;
pub mod identifiers;

// Re-export all public types for convenience
pub use config::*;
pub use enums::*;
pub use identifiers::*;
