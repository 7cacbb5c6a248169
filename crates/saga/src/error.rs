use thiserror::Error;

use crate::saga::SagaId;

pub type Result<T> = std::result::Result<T, SagaError>;

#[derive(Debug, Error)]
pub enum SagaError {
    #[error("invalid saga request: {0}")]
    Validation(String),

    #[error("inventory service error: {0}")]
    Inventory(String),

    #[error("payment service error: {0}")]
    Payment(String),

    #[error("order record service error: {0}")]
    OrderRecord(String),

    #[error("step timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("saga not found: {0}")]
    NotFound(SagaId),

    #[error("saga store error: {0}")]
    Store(String),

    #[error("event log error: {0}")]
    EventLog(#[from] event_log::EventLogError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
