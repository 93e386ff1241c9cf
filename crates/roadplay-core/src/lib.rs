//! roadplay Core - Fundamental types shared by every roadplay crate
//!
//! This crate defines:
//! - Identifiers (EntityId, LaneId, Category)
//! - Simulated time (SimTime)
//! - Measurement and lane tables
//! - The raw record schema and the canonical Event
//! - The error type

pub mod id;
pub mod time;
pub mod table;
pub mod event;
pub mod error;

pub use id::*;
pub use time::*;
pub use table::*;
pub use event::*;
pub use error::*;
