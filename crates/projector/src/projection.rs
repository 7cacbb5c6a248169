use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::events::{
    OrderCancelledPayload, OrderCreatedPayload, OrderUpdatedPayload, PaymentAuthorizedPayload,
    PaymentFailedPayload, event_types,
};
use common::{ClientId, OrderId, OrderItem};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::{RecordStore, StoredEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Cancelled,
    PaymentFailed,
}

/// Current state of one order, rebuilt by folding its stored events in
/// insertion order. Last write wins per field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderProjection {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub total: f64,
    pub items: Vec<OrderItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_authorized_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_failed_at: Option<DateTime<Utc>>,
    /// How many stored events contributed to this projection.
    pub event_count: u64,
}

impl OrderProjection {
    fn empty(order_id: OrderId) -> Self {
        Self {
            order_id,
            status: OrderStatus::Pending,
            total: 0.0,
            items: Vec::new(),
            client_id: None,
            shipping_address: None,
            billing_address: None,
            created_at: None,
            updated_at: None,
            cancelled_at: None,
            cancel_reason: None,
            payment_authorized_at: None,
            payment_failed_at: None,
            event_count: 0,
        }
    }

    /// Folds the given events, in the order given, into a projection.
    pub fn fold(order_id: OrderId, events: &[StoredEvent]) -> Option<Self> {
        if events.is_empty() {
            return None;
        }
        let mut projection = Self::empty(order_id);
        for event in events {
            projection.apply(event);
        }
        Some(projection)
    }

    /// Applies one event. Unknown types and malformed payloads are skipped;
    /// a projection must survive whatever the log carried.
    pub fn apply(&mut self, event: &StoredEvent) {
        self.event_count += 1;
        match event.event_type.as_str() {
            event_types::ORDER_CREATED => {
                match serde_json::from_value::<OrderCreatedPayload>(event.payload.clone()) {
                    Ok(order) => {
                        self.status = OrderStatus::Pending;
                        self.total = order.total;
                        self.items = order.items;
                        self.client_id = Some(order.client_id);
                        self.created_at = Some(event.timestamp);
                        if !order.shipping_address.is_empty() {
                            self.shipping_address = Some(order.shipping_address);
                        }
                        if !order.billing_address.is_empty() {
                            self.billing_address = Some(order.billing_address);
                        }
                    }
                    Err(err) => self.skip(event, err),
                }
            }
            event_types::ORDER_UPDATED => {
                match serde_json::from_value::<OrderUpdatedPayload>(event.payload.clone()) {
                    Ok(update) => {
                        self.total = update.total;
                        self.items = update.items;
                        self.updated_at = Some(event.timestamp);
                        if !update.shipping_address.is_empty() {
                            self.shipping_address = Some(update.shipping_address);
                        }
                        if !update.billing_address.is_empty() {
                            self.billing_address = Some(update.billing_address);
                        }
                    }
                    Err(err) => self.skip(event, err),
                }
            }
            event_types::ORDER_CANCELLED => {
                match serde_json::from_value::<OrderCancelledPayload>(event.payload.clone()) {
                    Ok(cancel) => {
                        self.status = OrderStatus::Cancelled;
                        self.cancelled_at = Some(event.timestamp);
                        self.cancel_reason = Some(cancel.reason);
                    }
                    Err(err) => self.skip(event, err),
                }
            }
            event_types::PAYMENT_AUTHORIZED => {
                match serde_json::from_value::<PaymentAuthorizedPayload>(event.payload.clone()) {
                    Ok(_) => {
                        self.status = OrderStatus::Confirmed;
                        self.payment_authorized_at = Some(event.timestamp);
                    }
                    Err(err) => self.skip(event, err),
                }
            }
            event_types::PAYMENT_FAILED => {
                match serde_json::from_value::<PaymentFailedPayload>(event.payload.clone()) {
                    Ok(_) => {
                        self.status = OrderStatus::PaymentFailed;
                        self.payment_failed_at = Some(event.timestamp);
                    }
                    Err(err) => self.skip(event, err),
                }
            }
            // StockReserved, OrderConfirmed etc. carry no projection fields
            _ => {}
        }
    }

    fn skip(&self, event: &StoredEvent, err: serde_json::Error) {
        tracing::warn!(
            event_id = %event.id,
            event_type = %event.event_type,
            error = %err,
            "malformed payload, skipping event"
        );
    }
}

/// Aggregate counters over every order the store knows about.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total_orders: u64,
    pub pending: u64,
    pub confirmed: u64,
    pub cancelled: u64,
    pub payment_failed: u64,
    pub total_revenue: f64,
}

/// Query side over a [`RecordStore`].
#[derive(Clone)]
pub struct OrderProjector {
    store: Arc<dyn RecordStore>,
}

impl OrderProjector {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Rebuilds the current state of one order, or `None` if the store has
    /// never seen it.
    pub async fn project(&self, order_id: &OrderId) -> Result<Option<OrderProjection>> {
        let events = self.store.events_for_order(order_id).await?;
        Ok(OrderProjection::fold(order_id.clone(), &events))
    }

    /// Raw stored history of one order, in fold order.
    pub async fn history(&self, order_id: &OrderId) -> Result<Vec<StoredEvent>> {
        self.store.events_for_order(order_id).await
    }

    /// Projections for every order a client has placed, in first-seen order.
    pub async fn orders_by_client(&self, client_id: ClientId) -> Result<Vec<OrderProjection>> {
        let events = self.store.events_for_client(client_id).await?;
        let mut order_ids: Vec<OrderId> = Vec::new();
        for event in &events {
            if let Some(id) = event.payload.get("orderId").and_then(|v| v.as_str()) {
                let id = OrderId::from(id);
                if !order_ids.contains(&id) {
                    order_ids.push(id);
                }
            }
        }

        let mut projections = Vec::with_capacity(order_ids.len());
        for order_id in order_ids {
            if let Some(projection) = self.project(&order_id).await? {
                projections.push(projection);
            }
        }
        Ok(projections)
    }

    /// Folds the order-lifecycle events globally into aggregate counters.
    ///
    /// Revenue accrues exactly once per order, on its `pending -> confirmed`
    /// transition, so replays and duplicate deliveries cannot double-count.
    pub async fn statistics(&self) -> Result<OrderStats> {
        let events = self
            .store
            .events_of_types(&[
                event_types::ORDER_CREATED,
                event_types::PAYMENT_AUTHORIZED,
                event_types::PAYMENT_FAILED,
                event_types::ORDER_CANCELLED,
            ])
            .await?;

        let mut statuses: HashMap<String, OrderStatus> = HashMap::new();
        let mut totals: HashMap<String, f64> = HashMap::new();
        let mut total_revenue = 0.0;

        for event in &events {
            let Some(order_id) = event.payload.get("orderId").and_then(|v| v.as_str()) else {
                continue;
            };
            match event.event_type.as_str() {
                event_types::ORDER_CREATED => {
                    let total = event
                        .payload
                        .get("total")
                        .and_then(|v| v.as_f64())
                        .unwrap_or(0.0);
                    totals.insert(order_id.to_string(), total);
                    statuses
                        .entry(order_id.to_string())
                        .or_insert(OrderStatus::Pending);
                }
                event_types::PAYMENT_AUTHORIZED => {
                    let status = statuses
                        .entry(order_id.to_string())
                        .or_insert(OrderStatus::Pending);
                    if *status == OrderStatus::Pending {
                        *status = OrderStatus::Confirmed;
                        total_revenue += totals.get(order_id).copied().unwrap_or(0.0);
                    }
                }
                event_types::PAYMENT_FAILED => {
                    statuses.insert(order_id.to_string(), OrderStatus::PaymentFailed);
                }
                event_types::ORDER_CANCELLED => {
                    statuses.insert(order_id.to_string(), OrderStatus::Cancelled);
                }
                _ => {}
            }
        }

        let mut stats = OrderStats {
            total_orders: statuses.len() as u64,
            pending: 0,
            confirmed: 0,
            cancelled: 0,
            payment_failed: 0,
            total_revenue,
        };
        for status in statuses.values() {
            match status {
                OrderStatus::Pending => stats.pending += 1,
                OrderStatus::Confirmed => stats.confirmed += 1,
                OrderStatus::Cancelled => stats.cancelled += 1,
                OrderStatus::PaymentFailed => stats.payment_failed += 1,
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRecordStore;
    use event_log::EventId;
    use serde_json::json;

    fn stored(event_type: &str, payload: serde_json::Value) -> StoredEvent {
        StoredEvent {
            id: EventId::new(),
            stream: "orders-events".to_string(),
            event_type: event_type.to_string(),
            timestamp: Utc::now(),
            payload,
        }
    }

    fn created(order_id: &str, client_id: i64, total: f64) -> StoredEvent {
        stored(
            "OrderCreated",
            json!({
                "orderId": order_id,
                "clientId": client_id,
                "items": [{"sku": 1, "qty": 2}],
                "total": total,
            }),
        )
    }

    async fn projector_with(events: Vec<StoredEvent>) -> OrderProjector {
        let store = Arc::new(InMemoryRecordStore::new());
        for event in events {
            store.insert_if_absent(event).await.unwrap();
        }
        OrderProjector::new(store)
    }

    #[tokio::test]
    async fn lifecycle_folds_to_confirmed() {
        let projector = projector_with(vec![
            created("1", 7, 59.9),
            stored("StockReserved", json!({"orderId": "1", "items": []})),
            stored("PaymentAuthorized", json!({"orderId": "1"})),
        ])
        .await;

        let projection = projector
            .project(&OrderId::from("1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(projection.status, OrderStatus::Confirmed);
        assert_eq!(projection.total, 59.9);
        assert_eq!(projection.client_id, Some(ClientId::new(7)));
        assert!(projection.payment_authorized_at.is_some());
        assert_eq!(projection.event_count, 3);
    }

    #[tokio::test]
    async fn unknown_order_projects_to_none() {
        let projector = projector_with(vec![]).await;
        assert!(projector
            .project(&OrderId::from("missing"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn update_overwrites_and_cancellation_wins() {
        let projector = projector_with(vec![
            created("1", 7, 10.0),
            stored(
                "OrderUpdated",
                json!({
                    "orderId": "1",
                    "items": [{"sku": 2, "qty": 1}],
                    "total": 25.0,
                }),
            ),
            stored("OrderCancelled", json!({"orderId": "1", "reason": "changed mind"})),
        ])
        .await;

        let projection = projector
            .project(&OrderId::from("1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(projection.status, OrderStatus::Cancelled);
        assert_eq!(projection.total, 25.0);
        assert_eq!(projection.items, vec![OrderItem::new(2, 1)]);
        assert_eq!(projection.cancel_reason.as_deref(), Some("changed mind"));
        assert!(projection.updated_at.is_some());
    }

    #[tokio::test]
    async fn fold_order_is_storage_order_not_timestamp_order() {
        // PaymentAuthorized stored before OrderCreated: the later stored
        // OrderCreated resets the status to pending.
        let projector = projector_with(vec![
            stored("PaymentAuthorized", json!({"orderId": "1"})),
            created("1", 7, 10.0),
        ])
        .await;

        let projection = projector
            .project(&OrderId::from("1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(projection.status, OrderStatus::Pending);
        assert!(projection.payment_authorized_at.is_some());
    }

    #[tokio::test]
    async fn malformed_payloads_are_skipped() {
        let projector = projector_with(vec![
            created("1", 7, 10.0),
            stored("OrderCancelled", json!({"orderId": "1"})),
        ])
        .await;

        let projection = projector
            .project(&OrderId::from("1"))
            .await
            .unwrap()
            .unwrap();
        // the cancellation is missing its reason, so it does not apply
        assert_eq!(projection.status, OrderStatus::Pending);
        assert_eq!(projection.event_count, 2);
    }

    #[tokio::test]
    async fn orders_by_client_groups_per_order() {
        let projector = projector_with(vec![
            created("1", 7, 10.0),
            created("2", 7, 20.0),
            created("3", 8, 30.0),
        ])
        .await;

        let orders = projector.orders_by_client(ClientId::new(7)).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].order_id.as_str(), "1");
        assert_eq!(orders[1].order_id.as_str(), "2");
    }

    #[tokio::test]
    async fn statistics_count_each_order_once() {
        let projector = projector_with(vec![
            created("1", 7, 100.0),
            created("2", 7, 50.0),
            created("3", 8, 30.0),
            stored("PaymentAuthorized", json!({"orderId": "1"})),
            // replayed authorization must not accrue revenue again
            stored("PaymentAuthorized", json!({"orderId": "1"})),
            stored("PaymentFailed", json!({"orderId": "2", "reason": "declined"})),
            stored("OrderCancelled", json!({"orderId": "3", "reason": "no stock"})),
        ])
        .await;

        let stats = projector.statistics().await.unwrap();
        assert_eq!(stats.total_orders, 3);
        assert_eq!(stats.confirmed, 1);
        assert_eq!(stats.payment_failed, 1);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.total_revenue, 100.0);
    }

    #[tokio::test]
    async fn statistics_on_empty_store() {
        let projector = projector_with(vec![]).await;
        let stats = projector.statistics().await.unwrap();
        assert_eq!(stats.total_orders, 0);
        assert_eq!(stats.total_revenue, 0.0);
    }
}
