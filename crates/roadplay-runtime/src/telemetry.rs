//! Logging setup

use roadplay_core::{RoadplayError, RoadplayResult};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
/// Honors `RUST_LOG`, defaulting to `info`.
pub fn init(json: bool) -> RoadplayResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| RoadplayError::Config(format!("logging: {e}")))
}
