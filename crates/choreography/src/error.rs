use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChoreographyError>;

#[derive(Debug, Error)]
pub enum ChoreographyError {
    #[error("event log error: {0}")]
    EventLog(#[from] event_log::EventLogError),

    #[error("malformed event payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}
