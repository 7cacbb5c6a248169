use thiserror::Error;

/// Errors that can occur when interacting with the event log.
#[derive(Debug, Error)]
pub enum EventLogError {
    /// The backing storage is unavailable. Fatal to the append caller, which
    /// must retry with backoff rather than drop the event.
    #[error("Log storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A payload could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for event log operations.
pub type Result<T> = std::result::Result<T, EventLogError>;
