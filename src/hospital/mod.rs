//! Surgical unit model
//!
//! Patients arrive, take a preparation room, then an operating theatre, then a
//! recovery bed. A patient whose operation ends while every recovery bed is
//! taken stays in the theatre, blocking it, until a bed is released.
//!
//! - **Patient**: per-patient record of drawn durations and phase timestamps
//! - **PatientProcess**: explicit state machine advanced by the scheduler
//! - **ArrivalGenerator**: seeded exponential interarrival and service draws
//! - **Monitor**: fixed-interval pool sampling after warmup
//! - **HospitalSystem**: owns pools and processes, dispatches wakeups
//!
//! # Usage Example
//!
//! ```rust
//! use surgical_flow_sim::engine::{Scheduler, SimTime};
//! use surgical_flow_sim::hospital::*;
//! use surgical_flow_sim::types::SimulationConfig;
//!
//! let config = SimulationConfig::default();
//! let mut system = HospitalSystem::new(&config, config.seed_for(0)).unwrap();
//! let mut scheduler = Scheduler::new();
//! system.start(&mut scheduler).unwrap();
//! scheduler.run(SimTime::new(config.sim_duration).unwrap(), &mut system).unwrap();
//!
//! let outcome = system.into_outcome();
//! assert!(outcome.total_arrived >= outcome.total_departed);
//! ```

pub mod arrivals;
pub mod monitor;
pub mod patient;
pub mod process;
pub mod system;

pub use arrivals::*;
pub use monitor::*;
pub use patient::*;
pub use process::*;
pub use system::*;
