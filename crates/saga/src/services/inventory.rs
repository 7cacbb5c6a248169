use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{OrderId, OrderItem};

use crate::error::{Result, SagaError};

/// Stock operations the saga orchestrates.
#[async_trait]
pub trait InventoryService: Send + Sync {
    /// Checks whether all items are available in the requested quantities.
    async fn verify(&self, items: &[OrderItem]) -> Result<bool>;

    /// Puts a hold on the items for the given order.
    async fn reserve(&self, order_id: &OrderId, items: &[OrderItem]) -> Result<()>;

    /// Releases a previously placed hold. Compensation path.
    async fn release(&self, order_id: &OrderId) -> Result<()>;
}

#[derive(Default)]
struct InventoryState {
    reservations: HashMap<OrderId, Vec<OrderItem>>,
    release_calls: u32,
    unavailable: bool,
    fail_on_verify: bool,
    fail_on_reserve: bool,
    fail_on_release: bool,
}

/// In-memory inventory with switches to simulate stock-outs and outages.
#[derive(Clone, Default)]
pub struct InMemoryInventoryService {
    state: Arc<RwLock<InventoryState>>,
}

impl InMemoryInventoryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `verify` report the stock as unavailable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.write().unwrap().unavailable = unavailable;
    }

    /// Makes `verify` fail as if the service were unreachable.
    pub fn set_fail_on_verify(&self, fail: bool) {
        self.state.write().unwrap().fail_on_verify = fail;
    }

    pub fn set_fail_on_reserve(&self, fail: bool) {
        self.state.write().unwrap().fail_on_reserve = fail;
    }

    pub fn set_fail_on_release(&self, fail: bool) {
        self.state.write().unwrap().fail_on_release = fail;
    }

    pub fn reservation_count(&self) -> usize {
        self.state.read().unwrap().reservations.len()
    }

    pub fn has_reservation(&self, order_id: &OrderId) -> bool {
        self.state.read().unwrap().reservations.contains_key(order_id)
    }

    pub fn release_call_count(&self) -> u32 {
        self.state.read().unwrap().release_calls
    }
}

#[async_trait]
impl InventoryService for InMemoryInventoryService {
    async fn verify(&self, _items: &[OrderItem]) -> Result<bool> {
        let state = self.state.read().unwrap();
        if state.fail_on_verify {
            return Err(SagaError::Inventory(
                "inventory service unavailable".to_string(),
            ));
        }
        Ok(!state.unavailable)
    }

    async fn reserve(&self, order_id: &OrderId, items: &[OrderItem]) -> Result<()> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_reserve {
            return Err(SagaError::Inventory("reservation rejected".to_string()));
        }
        state.reservations.insert(order_id.clone(), items.to_vec());
        Ok(())
    }

    async fn release(&self, order_id: &OrderId) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.release_calls += 1;
        if state.fail_on_release {
            return Err(SagaError::Inventory("release rejected".to_string()));
        }
        state.reservations.remove(order_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reserve_then_release_clears_the_hold() {
        let inventory = InMemoryInventoryService::new();
        let order = OrderId::from("order-1");
        inventory
            .reserve(&order, &[OrderItem::new(1, 2)])
            .await
            .unwrap();
        assert!(inventory.has_reservation(&order));

        inventory.release(&order).await.unwrap();
        assert!(!inventory.has_reservation(&order));
        assert_eq!(inventory.release_call_count(), 1);
    }

    #[tokio::test]
    async fn verify_reports_configured_availability() {
        let inventory = InMemoryInventoryService::new();
        assert!(inventory.verify(&[OrderItem::new(1, 1)]).await.unwrap());

        inventory.set_unavailable(true);
        assert!(!inventory.verify(&[OrderItem::new(1, 1)]).await.unwrap());

        inventory.set_fail_on_verify(true);
        assert!(inventory.verify(&[OrderItem::new(1, 1)]).await.is_err());
    }
}
