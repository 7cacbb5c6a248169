use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::SagaState;

/// Unique identifier of a saga run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SagaId(Uuid);

impl SagaId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SagaId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SagaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for SagaId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Success,
    Failed,
}

/// One entry in a saga's step history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub step: u8,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Durable record of a single saga run.
///
/// The step history is append-only: exactly one entry per attempted step,
/// recorded whether the step succeeded or failed. Once a terminal state is
/// reached the record is no longer mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Saga {
    id: SagaId,
    order_id: OrderId,
    state: SagaState,
    current_step: u8,
    step_history: Vec<StepRecord>,
    started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_error: Option<String>,
}

impl Saga {
    /// Opens a new saga at step 0 with a `CREATED` entry already recorded.
    pub fn begin(order_id: OrderId) -> Self {
        let now = Utc::now();
        Self {
            id: SagaId::new(),
            order_id,
            state: SagaState::Created,
            current_step: 0,
            step_history: vec![StepRecord {
                step: 0,
                name: SagaState::Created.as_str().to_string(),
                timestamp: now,
                status: StepStatus::Success,
                error: None,
            }],
            started_at: now,
            finished_at: None,
            duration_ms: None,
            last_error: None,
        }
    }

    pub fn id(&self) -> SagaId {
        self.id
    }

    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    pub fn state(&self) -> SagaState {
        self.state
    }

    pub fn current_step(&self) -> u8 {
        self.current_step
    }

    pub fn step_history(&self) -> &[StepRecord] {
        &self.step_history
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.duration_ms
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    /// Records a successfully completed step and advances the cursor.
    pub fn record_success(&mut self, step: u8, state: SagaState) {
        debug_assert!(!self.is_finished());
        debug_assert_eq!(step, self.current_step + 1);
        self.state = state;
        self.current_step = step;
        self.step_history.push(StepRecord {
            step,
            name: state.as_str().to_string(),
            timestamp: Utc::now(),
            status: StepStatus::Success,
            error: None,
        });
    }

    /// Records a failed step attempt. The cursor still advances to the failed
    /// step so that compensation thresholds see how far execution reached.
    pub fn record_failure(&mut self, step: u8, state: SagaState, error: impl Into<String>) {
        debug_assert!(!self.is_finished());
        debug_assert_eq!(step, self.current_step + 1);
        let error = error.into();
        self.state = state;
        self.current_step = step;
        self.last_error = Some(error.clone());
        self.step_history.push(StepRecord {
            step,
            name: state.as_str().to_string(),
            timestamp: Utc::now(),
            status: StepStatus::Failed,
            error: Some(error),
        });
    }

    /// Seals the saga with a terminal state and stamps its duration.
    pub fn finish(&mut self, state: SagaState, error: Option<String>) {
        debug_assert!(state.is_terminal());
        let now = Utc::now();
        self.state = state;
        self.finished_at = Some(now);
        self.duration_ms = Some((now - self.started_at).num_milliseconds());
        if error.is_some() {
            self.last_error = error;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_opens_at_step_zero_with_created_entry() {
        let saga = Saga::begin(OrderId::from("order-1"));
        assert_eq!(saga.state(), SagaState::Created);
        assert_eq!(saga.current_step(), 0);
        assert_eq!(saga.step_history().len(), 1);
        assert_eq!(saga.step_history()[0].name, "CREATED");
        assert_eq!(saga.step_history()[0].status, StepStatus::Success);
        assert!(!saga.is_finished());
    }

    #[test]
    fn record_success_advances_cursor_and_appends() {
        let mut saga = Saga::begin(OrderId::from("order-1"));
        saga.record_success(1, SagaState::StockVerified);
        saga.record_success(2, SagaState::StockReserved);

        assert_eq!(saga.current_step(), 2);
        assert_eq!(saga.state(), SagaState::StockReserved);
        assert_eq!(saga.step_history().len(), 3);
        assert_eq!(saga.step_history()[2].name, "STOCK_RESERVED");
    }

    #[test]
    fn record_failure_keeps_reached_step_and_error() {
        let mut saga = Saga::begin(OrderId::from("order-1"));
        saga.record_success(1, SagaState::StockVerified);
        saga.record_success(2, SagaState::StockReserved);
        saga.record_failure(3, SagaState::PaymentAttempted, "card declined");

        assert_eq!(saga.current_step(), 3);
        assert_eq!(saga.last_error(), Some("card declined"));
        let last = saga.step_history().last().unwrap();
        assert_eq!(last.status, StepStatus::Failed);
        assert_eq!(last.error.as_deref(), Some("card declined"));
    }

    #[test]
    fn finish_seals_the_record() {
        let mut saga = Saga::begin(OrderId::from("order-1"));
        saga.finish(SagaState::Cancelled, Some("insufficient stock".into()));

        assert!(saga.is_finished());
        assert_eq!(saga.state(), SagaState::Cancelled);
        assert!(saga.duration_ms().is_some());
        assert_eq!(saga.last_error(), Some("insufficient stock"));
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let saga = Saga::begin(OrderId::from("order-1"));
        let json = serde_json::to_value(&saga).unwrap();
        assert_eq!(json["orderId"], "order-1");
        assert_eq!(json["currentStep"], 0);
        assert!(json["stepHistory"].is_array());
        assert!(json.get("finishedAt").is_none());
    }
}
