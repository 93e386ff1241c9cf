//! Error types for roadplay

use thiserror::Error;

use crate::{EntityId, SimTime};

/// Core roadplay errors
#[derive(Error, Debug)]
pub enum RoadplayError {
    // Model errors
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    #[error("No motion model: no init event consumed yet")]
    NoModel,

    // Record errors
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Malformed category {category}: {reason}")]
    MalformedCategory { category: String, reason: String },

    // Ordering errors
    #[error("Event at {event} arrived after event at {previous}")]
    OutOfOrder { event: SimTime, previous: SimTime },

    // Feed errors
    #[error("Event feed closed")]
    FeedClosed,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for roadplay operations
pub type RoadplayResult<T> = Result<T, RoadplayError>;
