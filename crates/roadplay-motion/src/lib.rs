//! roadplay Motion - the continuous model the reconciler drives
//!
//! This crate provides:
//! - The MotionModel / ModelFactory seam
//! - KinematicModel, a constant-acceleration reference model seeded
//!   from pairwise measurements

pub mod model;
pub mod kinematic;

pub use model::*;
pub use kinematic::*;
