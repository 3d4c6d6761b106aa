//! Error types for the delivery tracking library.

use event_schema::SchemaError;
use thiserror::Error;

/// Result type alias for counter store and registry operations.
pub type TrackingResult<T> = Result<T, TrackingError>;

/// Configuration errors. These are fatal at startup and never expected at
/// runtime once the topic registry is fixed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackingError {
    /// Topic was not registered at startup
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    /// Counter name is not one of queued, inProcess, failed, success
    #[error("Unknown counter: {0}")]
    UnknownCounter(String),

    #[error("Topic registry is empty")]
    EmptyRegistry,

    #[error("Invalid topic name: {0:?}")]
    InvalidTopic(String),

    #[error("Duplicate topic: {0}")]
    DuplicateTopic(String),
}

/// Errors surfaced to the HTTP caller by the producer gateway.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    /// Payload failed boundary validation
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] SchemaError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Broker client refused the send synchronously
    #[error("Publish rejected: {0}")]
    Rejected(String),
}

/// Business handler failure. Recovered by the retry state machine, never
/// propagated out of the consumer loop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Processing failed: {0}")]
pub struct ProcessingFailure(pub String);

impl ProcessingFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}
