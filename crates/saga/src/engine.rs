use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use common::events::{OrderCancelledPayload, PaymentAuthorizedPayload, event_types};
use common::{ClientId, OrderId, OrderItem};
use event_log::{EventLog, EventLogExt, Topic};
use serde::Deserialize;

use crate::error::{Result, SagaError};
use crate::saga::Saga;
use crate::services::{InventoryService, OrderRecordService, PaymentService};
use crate::state::SagaState;
use crate::store::{SagaStatistics, SagaStore};

const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(10);
const OUTCOME_APPEND_ATTEMPTS: u32 = 3;

/// Everything the engine needs to know about the order being fulfilled.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderContext {
    pub order_id: OrderId,
    pub items: Vec<OrderItem>,
    pub amount: f64,
    pub payment_method: String,
    pub client_id: ClientId,
}

/// How a saga run was interrupted before confirmation.
enum Interruption {
    /// A step failed; the failure entry is already in the step history.
    Step(String),
    /// The engine itself could not make progress (store outage etc).
    Infra(SagaError),
}

/// Orchestrates the four-step fulfillment sequence for one order at a time.
///
/// Steps run strictly in order, each bounded by a timeout, with no retries.
/// On step failure, completed steps are compensated in reverse order and the
/// saga ends `CANCELLED`; compensation itself is best-effort and never
/// escalates. Terminal outcomes are appended to the event log.
pub struct SagaEngine<St> {
    store: St,
    inventory: Arc<dyn InventoryService>,
    payment: Arc<dyn PaymentService>,
    orders: Arc<dyn OrderRecordService>,
    log: Arc<dyn EventLog>,
    orders_topic: Topic,
    payments_topic: Topic,
    step_timeout: Duration,
}

impl<St: SagaStore> SagaEngine<St> {
    pub fn new(
        store: St,
        inventory: Arc<dyn InventoryService>,
        payment: Arc<dyn PaymentService>,
        orders: Arc<dyn OrderRecordService>,
        log: Arc<dyn EventLog>,
        orders_topic: Topic,
        payments_topic: Topic,
    ) -> Self {
        Self {
            store,
            inventory,
            payment,
            orders,
            log,
            orders_topic,
            payments_topic,
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Runs a saga to completion and returns its terminal record.
    ///
    /// A cancelled saga is still an `Ok` outcome here: the run finished and
    /// the record says how. `Err` means the request was invalid or the engine
    /// could not open the saga at all.
    #[tracing::instrument(skip(self, ctx), fields(order_id = %ctx.order_id))]
    pub async fn start(&self, ctx: OrderContext) -> Result<Saga> {
        validate(&ctx)?;

        let mut saga = Saga::begin(ctx.order_id.clone());
        self.store.insert(saga.clone()).await?;
        tracing::info!(saga_id = %saga.id(), "saga started");
        metrics::counter!("sagas_started_total").increment(1);

        match self.run_steps(&mut saga, &ctx).await {
            Ok(()) => {
                saga.finish(SagaState::Confirmed, None);
                self.store.update(saga.clone()).await?;
                self.emit_outcome(
                    &self.payments_topic,
                    event_types::PAYMENT_AUTHORIZED,
                    &PaymentAuthorizedPayload {
                        order_id: ctx.order_id.clone(),
                    },
                )
                .await;
                metrics::counter!("sagas_finished_total", "outcome" => "confirmed").increment(1);
                tracing::info!(
                    saga_id = %saga.id(),
                    duration_ms = ?saga.duration_ms(),
                    "saga confirmed"
                );
            }
            Err(Interruption::Step(reason)) => {
                self.compensate(&saga).await;
                saga.finish(SagaState::Cancelled, Some(reason.clone()));
                self.store.update(saga.clone()).await?;
                self.emit_outcome(
                    &self.orders_topic,
                    event_types::ORDER_CANCELLED,
                    &OrderCancelledPayload {
                        order_id: ctx.order_id.clone(),
                        reason,
                    },
                )
                .await;
                metrics::counter!("sagas_finished_total", "outcome" => "cancelled").increment(1);
                tracing::info!(saga_id = %saga.id(), "saga cancelled");
            }
            Err(Interruption::Infra(err)) => {
                // The step history could not be persisted, so what was
                // actually reached is unknown and compensation would guess.
                saga.finish(SagaState::Failed, Some(err.to_string()));
                if let Err(update_err) = self.store.update(saga.clone()).await {
                    tracing::error!(
                        saga_id = %saga.id(),
                        error = %update_err,
                        "could not persist failed saga"
                    );
                }
                metrics::counter!("sagas_finished_total", "outcome" => "failed").increment(1);
                tracing::error!(saga_id = %saga.id(), error = %err, "saga failed");
            }
        }

        Ok(saga)
    }

    pub async fn get_saga(&self, id: crate::saga::SagaId) -> Result<Option<Saga>> {
        self.store.get(id).await
    }

    pub async fn sagas_for_order(&self, order_id: &OrderId) -> Result<Vec<Saga>> {
        self.store.find_by_order(order_id).await
    }

    pub async fn recent_sagas(&self, limit: usize) -> Result<Vec<Saga>> {
        self.store.recent(limit).await
    }

    pub async fn statistics(&self) -> Result<SagaStatistics> {
        self.store.statistics().await
    }

    async fn run_steps(
        &self,
        saga: &mut Saga,
        ctx: &OrderContext,
    ) -> std::result::Result<(), Interruption> {
        // Step 1: is the stock there at all?
        match self.bounded(self.inventory.verify(&ctx.items)).await {
            Ok(true) => self.pass_step(saga, 1, SagaState::StockVerified).await?,
            Ok(false) => {
                return Err(self
                    .fail_step(saga, 1, SagaState::StockVerified, "insufficient stock".into())
                    .await);
            }
            Err(err) => {
                return Err(self
                    .fail_step(saga, 1, SagaState::StockVerified, err.to_string())
                    .await);
            }
        }

        // Step 2: put a hold on it.
        match self
            .bounded(self.inventory.reserve(&ctx.order_id, &ctx.items))
            .await
        {
            Ok(()) => self.pass_step(saga, 2, SagaState::StockReserved).await?,
            Err(err) => {
                return Err(self
                    .fail_step(saga, 2, SagaState::StockReserved, err.to_string())
                    .await);
            }
        }

        // Step 3: take the money.
        match self
            .bounded(
                self.payment
                    .charge(&ctx.order_id, ctx.amount, &ctx.payment_method),
            )
            .await
        {
            Ok(()) => self.pass_step(saga, 3, SagaState::PaymentAttempted).await?,
            Err(err) => {
                return Err(self
                    .fail_step(saga, 3, SagaState::PaymentAttempted, err.to_string())
                    .await);
            }
        }

        // Step 4: stamp the legacy order record. Only integer-shaped order
        // ids exist over there; anything else is confirmed without it.
        match ctx.order_id.as_numeric() {
            Some(numeric) => {
                match self
                    .bounded(self.orders.set_state(numeric, SagaState::Confirmed.as_str()))
                    .await
                {
                    Ok(()) => self.pass_step(saga, 4, SagaState::Confirmed).await?,
                    Err(err) => {
                        return Err(self
                            .fail_step(saga, 4, SagaState::Confirmed, err.to_string())
                            .await);
                    }
                }
            }
            None => {
                tracing::warn!(
                    saga_id = %saga.id(),
                    order_id = %ctx.order_id,
                    "order id is not numeric, skipping order record update"
                );
                self.pass_step(saga, 4, SagaState::Confirmed).await?;
            }
        }

        Ok(())
    }

    async fn pass_step(
        &self,
        saga: &mut Saga,
        step: u8,
        state: SagaState,
    ) -> std::result::Result<(), Interruption> {
        saga.record_success(step, state);
        self.store
            .update(saga.clone())
            .await
            .map_err(Interruption::Infra)?;
        tracing::info!(saga_id = %saga.id(), step, state = %state, "saga step completed");
        Ok(())
    }

    /// Records the failure (before any compensation runs) and persists it.
    async fn fail_step(
        &self,
        saga: &mut Saga,
        step: u8,
        state: SagaState,
        reason: String,
    ) -> Interruption {
        tracing::warn!(saga_id = %saga.id(), step, state = %state, %reason, "saga step failed");
        metrics::counter!("saga_steps_failed_total", "step" => state.as_str()).increment(1);
        saga.record_failure(step, state, reason.clone());
        if let Err(err) = self.store.update(saga.clone()).await {
            return Interruption::Infra(err);
        }
        Interruption::Step(reason)
    }

    /// Undoes completed steps in reverse order. Best-effort: failures are
    /// logged and never escalate past this point.
    async fn compensate(&self, saga: &Saga) {
        let order_id = saga.order_id();

        if saga.current_step() >= 3 {
            tracing::info!(saga_id = %saga.id(), %order_id, "compensating payment");
            metrics::counter!("saga_compensations_total", "action" => "cancel_payment")
                .increment(1);
            match tokio::time::timeout(self.step_timeout, self.payment.cancel(order_id)).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::error!(saga_id = %saga.id(), error = %err, "payment compensation failed");
                }
                Err(_) => {
                    tracing::error!(saga_id = %saga.id(), "payment compensation timed out");
                }
            }
        }

        if saga.current_step() >= 2 {
            tracing::info!(saga_id = %saga.id(), %order_id, "compensating stock reservation");
            metrics::counter!("saga_compensations_total", "action" => "release_stock")
                .increment(1);
            match tokio::time::timeout(self.step_timeout, self.inventory.release(order_id)).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::error!(saga_id = %saga.id(), error = %err, "stock compensation failed");
                }
                Err(_) => {
                    tracing::error!(saga_id = %saga.id(), "stock compensation timed out");
                }
            }
        }
    }

    /// Appends a terminal-outcome event, retrying with backoff. Losing the
    /// event is logged but does not change the saga outcome.
    async fn emit_outcome<T: serde::Serialize + Sync>(
        &self,
        topic: &Topic,
        event_type: &str,
        payload: &T,
    ) {
        let mut delay = Duration::from_millis(50);
        for attempt in 1..=OUTCOME_APPEND_ATTEMPTS {
            match self.log.publish(topic, event_type, payload).await {
                Ok(_) => return,
                Err(err) if attempt < OUTCOME_APPEND_ATTEMPTS => {
                    tracing::warn!(
                        %topic,
                        event_type,
                        attempt,
                        error = %err,
                        "outcome append failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(err) => {
                    tracing::error!(%topic, event_type, error = %err, "outcome event lost");
                }
            }
        }
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.step_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(SagaError::Timeout(self.step_timeout)),
        }
    }
}

fn validate(ctx: &OrderContext) -> Result<()> {
    if ctx.order_id.as_str().is_empty() {
        return Err(SagaError::Validation("orderId must not be empty".into()));
    }
    if ctx.items.is_empty() {
        return Err(SagaError::Validation("items must not be empty".into()));
    }
    if ctx.items.iter().any(|item| item.quantity == 0) {
        return Err(SagaError::Validation(
            "item quantities must be at least 1".into(),
        ));
    }
    if !ctx.amount.is_finite() || ctx.amount <= 0.0 {
        return Err(SagaError::Validation(
            "amount must be a positive number".into(),
        ));
    }
    if ctx.payment_method.is_empty() {
        return Err(SagaError::Validation(
            "paymentMethod must not be empty".into(),
        ));
    }
    Ok(())
}
