//! Discrete-event engine
//!
//! Domain-independent building blocks of the simulation:
//!
//! - **SimTime**: totally ordered simulated clock value
//! - **Scheduler**: time-ordered queue of pending resumptions with FIFO tie-break
//! - **ResourcePool**: fixed-capacity slot pool with a FIFO wait list of tickets
//!
//! # Usage Example
//!
//! ```rust
//! use surgical_flow_sim::engine::*;
//! use surgical_flow_sim::types::PoolKind;
//!
//! let mut pool = ResourcePool::new(PoolKind::Theatre, 1).unwrap();
//! let holder = pool.request();
//! let waiter = pool.request();
//! assert!(holder.is_granted());
//! assert!(!waiter.is_granted());
//! assert_eq!(pool.release(holder.ticket()).unwrap(), Some(waiter.ticket()));
//! ```

pub mod clock;
pub mod resource;
pub mod scheduler;

pub use clock::*;
pub use resource::*;
pub use scheduler::*;
