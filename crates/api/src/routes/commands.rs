//! Command entry point for the choreographed path.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::events::{OrderCreatedPayload, event_types};
use common::{ClientId, OrderId, OrderItem};
use event_log::EventRecord;
use saga::SagaStore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::sagas::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderCommand {
    pub client_id: ClientId,
    pub items: Vec<OrderItem>,
    pub total: f64,
    #[serde(default)]
    pub shipping_address: String,
    #[serde(default)]
    pub billing_address: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAcceptedResponse {
    pub order_id: OrderId,
    pub event_id: event_log::EventId,
    pub stream: String,
}

/// POST /api/commands/orders — accepts an order and emits `OrderCreated`.
///
/// The response is a 202: the fulfillment chain picks the event up
/// asynchronously, and the read side at `/projection/{orderId}` shows the
/// order's progress.
pub async fn create_order<St: SagaStore>(
    State(state): State<Arc<AppState<St>>>,
    Json(command): Json<CreateOrderCommand>,
) -> Result<(StatusCode, Json<OrderAcceptedResponse>), ApiError> {
    if command.items.is_empty() {
        return Err(ApiError::BadRequest("items must not be empty".to_string()));
    }
    if !command.total.is_finite() || command.total <= 0.0 {
        return Err(ApiError::BadRequest(
            "total must be a positive number".to_string(),
        ));
    }

    let order_id = OrderId::new(Uuid::new_v4().to_string());
    let payload = OrderCreatedPayload {
        order_id: order_id.clone(),
        client_id: command.client_id,
        items: command.items,
        total: command.total,
        shipping_address: command.shipping_address,
        billing_address: command.billing_address,
    };

    let record = EventRecord::from_payload(event_types::ORDER_CREATED, &payload)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let event_id = record.id;
    state.log.append(&state.orders_topic, record).await?;

    tracing::info!(%order_id, %event_id, "order accepted");
    Ok((
        StatusCode::ACCEPTED,
        Json(OrderAcceptedResponse {
            order_id,
            event_id,
            stream: state.orders_topic.as_str().to_string(),
        }),
    ))
}
