use std::sync::Arc;

use async_trait::async_trait;
use common::events::{
    OrderCreatedPayload, StockReservationFailedPayload, StockReservedPayload, event_types,
};
use event_log::{EventLog, EventLogExt, EventRecord, Topic};

use crate::dedup::IdempotencyKeys;
use crate::error::Result;
use crate::participant::EventHandler;
use crate::policy::{PolicyDecision, ReservationPolicy};

/// Reacts to `OrderCreated` on the orders topic by reserving stock and
/// publishing `StockReserved` (or `StockReservationFailed`) to the stock
/// topic.
pub struct InventoryReservationHandler {
    log: Arc<dyn EventLog>,
    orders_topic: Topic,
    stock_topic: Topic,
    policy: Arc<dyn ReservationPolicy>,
    seen: IdempotencyKeys,
}

impl InventoryReservationHandler {
    pub fn new(
        log: Arc<dyn EventLog>,
        orders_topic: Topic,
        stock_topic: Topic,
        policy: Arc<dyn ReservationPolicy>,
    ) -> Self {
        Self {
            log,
            orders_topic,
            stock_topic,
            policy,
            seen: IdempotencyKeys::new(),
        }
    }
}

#[async_trait]
impl EventHandler for InventoryReservationHandler {
    fn name(&self) -> &'static str {
        "inventory-reservation"
    }

    fn topic(&self) -> &Topic {
        &self.orders_topic
    }

    async fn handle(&self, record: &EventRecord) -> Result<()> {
        if record.event_type != event_types::ORDER_CREATED {
            return Ok(());
        }
        let order: OrderCreatedPayload = record.payload_as()?;

        match self.policy.decide(&order) {
            PolicyDecision::Approve => {
                if self
                    .seen
                    .already_published(&order.order_id, event_types::STOCK_RESERVED)
                {
                    tracing::debug!(order_id = %order.order_id, "duplicate OrderCreated, skipping");
                    return Ok(());
                }
                tracing::info!(order_id = %order.order_id, "reserving stock");
                let order_id = order.order_id.clone();
                self.log
                    .publish(
                        &self.stock_topic,
                        event_types::STOCK_RESERVED,
                        &StockReservedPayload {
                            order_id: order.order_id,
                            items: order.items,
                        },
                    )
                    .await?;
                // only now: a failed publish must stay retryable
                self.seen.record(&order_id, event_types::STOCK_RESERVED);
            }
            PolicyDecision::Reject { reason } => {
                if self
                    .seen
                    .already_published(&order.order_id, event_types::STOCK_RESERVATION_FAILED)
                {
                    return Ok(());
                }
                tracing::warn!(order_id = %order.order_id, %reason, "stock reservation rejected");
                let order_id = order.order_id.clone();
                self.log
                    .publish(
                        &self.stock_topic,
                        event_types::STOCK_RESERVATION_FAILED,
                        &StockReservationFailedPayload {
                            order_id: order.order_id,
                            items: order.items,
                            reason,
                        },
                    )
                    .await?;
                self.seen
                    .record(&order_id, event_types::STOCK_RESERVATION_FAILED);
            }
        }
        Ok(())
    }
}
