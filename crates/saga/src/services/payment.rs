use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::OrderId;

use crate::error::{Result, SagaError};

/// Payment operations the saga orchestrates.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Charges the given amount for the order.
    async fn charge(&self, order_id: &OrderId, amount: f64, method: &str) -> Result<()>;

    /// Voids a previously taken charge. Compensation path.
    async fn cancel(&self, order_id: &OrderId) -> Result<()>;
}

#[derive(Default)]
struct PaymentState {
    charges: HashMap<OrderId, f64>,
    cancel_calls: u32,
    fail_on_charge: bool,
    fail_on_cancel: bool,
}

/// In-memory payment processor with switches to simulate declines.
#[derive(Clone, Default)]
pub struct InMemoryPaymentService {
    state: Arc<RwLock<PaymentState>>,
}

impl InMemoryPaymentService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_on_charge(&self, fail: bool) {
        self.state.write().unwrap().fail_on_charge = fail;
    }

    pub fn set_fail_on_cancel(&self, fail: bool) {
        self.state.write().unwrap().fail_on_cancel = fail;
    }

    pub fn charged_amount(&self, order_id: &OrderId) -> Option<f64> {
        self.state.read().unwrap().charges.get(order_id).copied()
    }

    pub fn cancel_call_count(&self) -> u32 {
        self.state.read().unwrap().cancel_calls
    }
}

#[async_trait]
impl PaymentService for InMemoryPaymentService {
    async fn charge(&self, order_id: &OrderId, amount: f64, _method: &str) -> Result<()> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_charge {
            return Err(SagaError::Payment("card declined".to_string()));
        }
        state.charges.insert(order_id.clone(), amount);
        Ok(())
    }

    async fn cancel(&self, order_id: &OrderId) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.cancel_calls += 1;
        if state.fail_on_cancel {
            return Err(SagaError::Payment("cancellation rejected".to_string()));
        }
        state.charges.remove(order_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn charge_then_cancel_voids_the_payment() {
        let payment = InMemoryPaymentService::new();
        let order = OrderId::from("order-1");
        payment.charge(&order, 99.5, "card").await.unwrap();
        assert_eq!(payment.charged_amount(&order), Some(99.5));

        payment.cancel(&order).await.unwrap();
        assert_eq!(payment.charged_amount(&order), None);
        assert_eq!(payment.cancel_call_count(), 1);
    }

    #[tokio::test]
    async fn charge_can_be_declined() {
        let payment = InMemoryPaymentService::new();
        payment.set_fail_on_charge(true);
        let err = payment
            .charge(&OrderId::from("order-1"), 10.0, "card")
            .await
            .unwrap_err();
        assert!(matches!(err, SagaError::Payment(_)));
    }
}
