use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ClientId, OrderId};
use event_log::{EventId, EventRecord, Topic};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;

/// An event exactly as the projector consumed it, plus the stream (topic)
/// it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    pub id: EventId,
    pub stream: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl StoredEvent {
    pub fn from_record(topic: &Topic, record: EventRecord) -> Self {
        Self {
            id: record.id,
            stream: topic.as_str().to_string(),
            event_type: record.event_type,
            timestamp: record.timestamp,
            payload: record.payload,
        }
    }

    fn payload_order_id(&self) -> Option<&str> {
        self.payload.get("orderId").and_then(|v| v.as_str())
    }

    fn payload_client_id(&self) -> Option<i64> {
        self.payload.get("clientId").and_then(|v| v.as_i64())
    }
}

/// Durable storage for consumed events, keyed by event id.
///
/// Insertion order is the fold order for every read-model query, so
/// implementations must preserve it.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Stores the event unless one with the same id already exists.
    /// Returns `false` for duplicates.
    async fn insert_if_absent(&self, event: StoredEvent) -> Result<bool>;

    /// All events whose payload names this order, in insertion order.
    async fn events_for_order(&self, order_id: &OrderId) -> Result<Vec<StoredEvent>>;

    /// All events whose payload names this client, in insertion order.
    async fn events_for_client(&self, client_id: ClientId) -> Result<Vec<StoredEvent>>;

    /// All events of the given types, in insertion order.
    async fn events_of_types(&self, types: &[&str]) -> Result<Vec<StoredEvent>>;

    async fn count(&self) -> Result<u64>;
}

#[derive(Default)]
struct Inner {
    events: Vec<StoredEvent>,
    ids: HashSet<Uuid>,
}

/// In-memory record store for tests and single-process runs.
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert_if_absent(&self, event: StoredEvent) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if !inner.ids.insert(event.id.as_uuid()) {
            return Ok(false);
        }
        inner.events.push(event);
        Ok(true)
    }

    async fn events_for_order(&self, order_id: &OrderId) -> Result<Vec<StoredEvent>> {
        let inner = self.inner.read().await;
        Ok(inner
            .events
            .iter()
            .filter(|e| e.payload_order_id() == Some(order_id.as_str()))
            .cloned()
            .collect())
    }

    async fn events_for_client(&self, client_id: ClientId) -> Result<Vec<StoredEvent>> {
        let inner = self.inner.read().await;
        Ok(inner
            .events
            .iter()
            .filter(|e| e.payload_client_id() == Some(client_id.as_i64()))
            .cloned()
            .collect())
    }

    async fn events_of_types(&self, types: &[&str]) -> Result<Vec<StoredEvent>> {
        let inner = self.inner.read().await;
        Ok(inner
            .events
            .iter()
            .filter(|e| types.contains(&e.event_type.as_str()))
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner.events.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    #[tokio::test]
    async fn duplicate_ids_are_stored_once() {
        let store = InMemoryRecordStore::new();
        let event = stored("OrderCreated", json!({"orderId": "1"}));
        let duplicate = event.clone();

        assert!(store.insert_if_absent(event).await.unwrap());
        assert!(!store.insert_if_absent(duplicate).await.unwrap());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn events_for_order_preserve_insertion_order() {
        let store = InMemoryRecordStore::new();
        store
            .insert_if_absent(stored("OrderCreated", json!({"orderId": "1"})))
            .await
            .unwrap();
        store
            .insert_if_absent(stored("OrderCreated", json!({"orderId": "2"})))
            .await
            .unwrap();
        store
            .insert_if_absent(stored("PaymentAuthorized", json!({"orderId": "1"})))
            .await
            .unwrap();

        let events = store
            .events_for_order(&OrderId::from("1"))
            .await
            .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "OrderCreated");
        assert_eq!(events[1].event_type, "PaymentAuthorized");
    }

    #[tokio::test]
    async fn filters_by_client_and_type() {
        let store = InMemoryRecordStore::new();
        store
            .insert_if_absent(stored("OrderCreated", json!({"orderId": "1", "clientId": 7})))
            .await
            .unwrap();
        store
            .insert_if_absent(stored("OrderCreated", json!({"orderId": "2", "clientId": 8})))
            .await
            .unwrap();
        store
            .insert_if_absent(stored("StockReserved", json!({"orderId": "1"})))
            .await
            .unwrap();

        let for_client = store.events_for_client(ClientId::new(7)).await.unwrap();
        assert_eq!(for_client.len(), 1);
        assert_eq!(for_client[0].payload["orderId"], "1");

        let created = store.events_of_types(&["OrderCreated"]).await.unwrap();
        assert_eq!(created.len(), 2);
    }
}
