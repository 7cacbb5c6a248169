use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::{Result, SagaError};

/// Port to the legacy order-record service, which addresses orders by
/// integer primary key.
#[async_trait]
pub trait OrderRecordService: Send + Sync {
    /// Stamps a new state onto the order record.
    async fn set_state(&self, order_id: i64, state: &str) -> Result<()>;
}

#[derive(Default)]
struct OrderRecordState {
    states: HashMap<i64, String>,
    fail_on_set_state: bool,
}

/// In-memory order-record service for tests.
#[derive(Clone, Default)]
pub struct InMemoryOrderRecordService {
    state: Arc<RwLock<OrderRecordState>>,
}

impl InMemoryOrderRecordService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_on_set_state(&self, fail: bool) {
        self.state.write().unwrap().fail_on_set_state = fail;
    }

    pub fn state_of(&self, order_id: i64) -> Option<String> {
        self.state.read().unwrap().states.get(&order_id).cloned()
    }
}

#[async_trait]
impl OrderRecordService for InMemoryOrderRecordService {
    async fn set_state(&self, order_id: i64, state: &str) -> Result<()> {
        let mut inner = self.state.write().unwrap();
        if inner.fail_on_set_state {
            return Err(SagaError::OrderRecord(
                "order record service unavailable".to_string(),
            ));
        }
        inner.states.insert(order_id, state.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_state_overwrites() {
        let orders = InMemoryOrderRecordService::new();
        orders.set_state(42, "PENDING").await.unwrap();
        orders.set_state(42, "CONFIRMED").await.unwrap();
        assert_eq!(orders.state_of(42).as_deref(), Some("CONFIRMED"));
    }
}
