use std::sync::Arc;

use async_trait::async_trait;
use common::events::{
    PaymentAuthorizedPayload, PaymentFailedPayload, StockReservedPayload, event_types,
};
use event_log::{EventLog, EventLogExt, EventRecord, Topic};

use crate::dedup::IdempotencyKeys;
use crate::error::Result;
use crate::participant::EventHandler;
use crate::policy::{AuthorizationPolicy, PolicyDecision};

/// Reacts to `StockReserved` on the stock topic by authorizing payment and
/// publishing `PaymentAuthorized` (or `PaymentFailed`) to the payments topic.
pub struct PaymentAuthorizationHandler {
    log: Arc<dyn EventLog>,
    stock_topic: Topic,
    payments_topic: Topic,
    policy: Arc<dyn AuthorizationPolicy>,
    seen: IdempotencyKeys,
}

impl PaymentAuthorizationHandler {
    pub fn new(
        log: Arc<dyn EventLog>,
        stock_topic: Topic,
        payments_topic: Topic,
        policy: Arc<dyn AuthorizationPolicy>,
    ) -> Self {
        Self {
            log,
            stock_topic,
            payments_topic,
            policy,
            seen: IdempotencyKeys::new(),
        }
    }
}

#[async_trait]
impl EventHandler for PaymentAuthorizationHandler {
    fn name(&self) -> &'static str {
        "payment-authorization"
    }

    fn topic(&self) -> &Topic {
        &self.stock_topic
    }

    async fn handle(&self, record: &EventRecord) -> Result<()> {
        if record.event_type != event_types::STOCK_RESERVED {
            return Ok(());
        }
        let reservation: StockReservedPayload = record.payload_as()?;

        match self.policy.decide(&reservation) {
            PolicyDecision::Approve => {
                if self
                    .seen
                    .already_published(&reservation.order_id, event_types::PAYMENT_AUTHORIZED)
                {
                    tracing::debug!(order_id = %reservation.order_id, "duplicate StockReserved, skipping");
                    return Ok(());
                }
                tracing::info!(order_id = %reservation.order_id, "authorizing payment");
                let order_id = reservation.order_id.clone();
                self.log
                    .publish(
                        &self.payments_topic,
                        event_types::PAYMENT_AUTHORIZED,
                        &PaymentAuthorizedPayload {
                            order_id: reservation.order_id,
                        },
                    )
                    .await?;
                self.seen.record(&order_id, event_types::PAYMENT_AUTHORIZED);
            }
            PolicyDecision::Reject { reason } => {
                if self
                    .seen
                    .already_published(&reservation.order_id, event_types::PAYMENT_FAILED)
                {
                    return Ok(());
                }
                tracing::warn!(order_id = %reservation.order_id, %reason, "payment declined");
                let order_id = reservation.order_id.clone();
                self.log
                    .publish(
                        &self.payments_topic,
                        event_types::PAYMENT_FAILED,
                        &PaymentFailedPayload {
                            order_id: reservation.order_id,
                            reason,
                        },
                    )
                    .await?;
                self.seen.record(&order_id, event_types::PAYMENT_FAILED);
            }
        }
        Ok(())
    }
}
