use std::collections::HashSet;
use std::sync::RwLock;

use common::OrderId;

/// Tracks which derived events a participant has already published.
///
/// The log delivers at-least-once: after a crash before the cursor advances,
/// the same event comes around again. Keys are `(orderId, produced event
/// type)`, so a re-delivered `OrderCreated` cannot reserve stock twice.
///
/// A key is recorded only once the publish has succeeded. A handler that
/// fails mid-way leaves no key behind, so the retried delivery publishes.
#[derive(Default)]
pub struct IdempotencyKeys {
    seen: RwLock<HashSet<(String, String)>>,
}

impl IdempotencyKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once `record` has been called for this `(order, event type)` pair.
    pub fn already_published(&self, order_id: &OrderId, produced_type: &str) -> bool {
        let key = (order_id.as_str().to_string(), produced_type.to_string());
        self.seen
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(&key)
    }

    /// Marks the pair as published.
    pub fn record(&self, order_id: &OrderId, produced_type: &str) {
        let key = (order_id.as_str().to_string(), produced_type.to_string());
        self.seen
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key);
    }
}
