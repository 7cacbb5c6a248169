use serde::{Deserialize, Serialize};

/// Lifecycle state of a fulfillment saga.
///
/// The five progress states form a strict sequence; `Cancelled` and `Failed`
/// are terminal and can be reached from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SagaState {
    Created,
    StockVerified,
    StockReserved,
    PaymentAttempted,
    Confirmed,
    Cancelled,
    Failed,
}

impl SagaState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaState::Created => "CREATED",
            SagaState::StockVerified => "STOCK_VERIFIED",
            SagaState::StockReserved => "STOCK_RESERVED",
            SagaState::PaymentAttempted => "PAYMENT_ATTEMPTED",
            SagaState::Confirmed => "CONFIRMED",
            SagaState::Cancelled => "CANCELLED",
            SagaState::Failed => "FAILED",
        }
    }

    /// Position of a progress state in the step sequence. Terminal states
    /// have no step index.
    pub fn step_index(&self) -> Option<u8> {
        match self {
            SagaState::Created => Some(0),
            SagaState::StockVerified => Some(1),
            SagaState::StockReserved => Some(2),
            SagaState::PaymentAttempted => Some(3),
            SagaState::Confirmed => Some(4),
            SagaState::Cancelled | SagaState::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SagaState::Confirmed | SagaState::Cancelled | SagaState::Failed
        )
    }
}

impl std::fmt::Display for SagaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
