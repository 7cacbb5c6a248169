use std::sync::Arc;

use async_trait::async_trait;
use common::events::{
    OrderCancelledPayload, OrderConfirmedPayload, PaymentAuthorizedPayload, PaymentFailedPayload,
    event_types,
};
use event_log::{EventLog, EventLogExt, EventRecord, Topic};

use crate::dedup::IdempotencyKeys;
use crate::error::Result;
use crate::participant::EventHandler;

/// Closes the chain: reacts to payment outcomes on the payments topic by
/// publishing `OrderConfirmed` or `OrderCancelled` back to the orders topic.
pub struct OrderConfirmationHandler {
    log: Arc<dyn EventLog>,
    payments_topic: Topic,
    orders_topic: Topic,
    seen: IdempotencyKeys,
}

impl OrderConfirmationHandler {
    pub fn new(log: Arc<dyn EventLog>, payments_topic: Topic, orders_topic: Topic) -> Self {
        Self {
            log,
            payments_topic,
            orders_topic,
            seen: IdempotencyKeys::new(),
        }
    }
}

#[async_trait]
impl EventHandler for OrderConfirmationHandler {
    fn name(&self) -> &'static str {
        "order-confirmation"
    }

    fn topic(&self) -> &Topic {
        &self.payments_topic
    }

    async fn handle(&self, record: &EventRecord) -> Result<()> {
        match record.event_type.as_str() {
            event_types::PAYMENT_AUTHORIZED => {
                let payment: PaymentAuthorizedPayload = record.payload_as()?;
                if self
                    .seen
                    .already_published(&payment.order_id, event_types::ORDER_CONFIRMED)
                {
                    tracing::debug!(order_id = %payment.order_id, "duplicate PaymentAuthorized, skipping");
                    return Ok(());
                }
                tracing::info!(order_id = %payment.order_id, "confirming order");
                let order_id = payment.order_id.clone();
                self.log
                    .publish(
                        &self.orders_topic,
                        event_types::ORDER_CONFIRMED,
                        &OrderConfirmedPayload {
                            order_id: payment.order_id,
                        },
                    )
                    .await?;
                self.seen.record(&order_id, event_types::ORDER_CONFIRMED);
            }
            event_types::PAYMENT_FAILED => {
                let failure: PaymentFailedPayload = record.payload_as()?;
                if self
                    .seen
                    .already_published(&failure.order_id, event_types::ORDER_CANCELLED)
                {
                    return Ok(());
                }
                tracing::warn!(order_id = %failure.order_id, reason = %failure.reason, "cancelling order");
                let order_id = failure.order_id.clone();
                self.log
                    .publish(
                        &self.orders_topic,
                        event_types::ORDER_CANCELLED,
                        &OrderCancelledPayload {
                            order_id: failure.order_id,
                            reason: failure.reason,
                        },
                    )
                    .await?;
                self.seen.record(&order_id, event_types::ORDER_CANCELLED);
            }
            _ => {}
        }
        Ok(())
    }
}
