use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProjectorError>;

#[derive(Debug, Error)]
pub enum ProjectorError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("event log error: {0}")]
    EventLog(#[from] event_log::EventLogError),
}
