//! roadplay State - turning records into events and keeping entities tracked
//!
//! This crate implements:
//! - EventNormalizer: raw records to canonical events, measurement and lane tables
//! - EntityRegistry: tracked entities kept in lock-step with the motion model

pub mod normalize;
pub mod registry;

pub use normalize::*;
pub use registry::*;
