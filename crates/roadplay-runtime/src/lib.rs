//! roadplay Runtime - replay orchestration and the per-frame loop
//!
//! This crate implements the reconciler loop:
//! 1. Drain the event feed
//! 2. Admit events the model clock has reached
//! 3. Apply init / accel / lane change
//! 4. Advance the model by the frame delta
//! 5. Scroll the viewport and place tracked entities

pub mod config;
pub mod driver;
pub mod feed;
pub mod reconciler;
pub mod render;
pub mod source;
pub mod telemetry;

pub use config::*;
pub use driver::*;
pub use feed::*;
pub use reconciler::*;
pub use render::*;
pub use source::*;
