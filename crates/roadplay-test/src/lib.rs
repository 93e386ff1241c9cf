//! roadplay Test Harness - replay validation and benchmarking
//!
//! This crate provides:
//! - A recording renderer with a shared call log
//! - Fixed replay scenarios
//! - Seeded random event streams
//! - End-to-end invariant tests

pub mod harness;
pub mod integration;
pub mod scenarios;

pub use harness::*;
pub use integration::*;
pub use scenarios::*;
