//! Read-side endpoints backed by the projector.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{ClientId, OrderId};
use projector::{OrderProjection, OrderStats, StoredEvent};
use saga::SagaStore;
use serde::Serialize;

use crate::error::ApiError;
use crate::routes::sagas::AppState;

/// GET /projection/{order_id} — current state of one order.
pub async fn projection<St: SagaStore>(
    State(state): State<Arc<AppState<St>>>,
    Path(order_id): Path<String>,
) -> Result<Json<OrderProjection>, ApiError> {
    let order_id = OrderId::from(order_id);
    let projection = state
        .projector
        .project(&order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no events for order {order_id}")))?;
    Ok(Json(projection))
}

/// GET /orders-by-client/{client_id}
pub async fn orders_by_client<St: SagaStore>(
    State(state): State<Arc<AppState<St>>>,
    Path(client_id): Path<i64>,
) -> Result<Json<Vec<OrderProjection>>, ApiError> {
    let orders = state
        .projector
        .orders_by_client(ClientId::new(client_id))
        .await?;
    Ok(Json(orders))
}

/// GET /order-stats — aggregate counters over every known order.
pub async fn order_stats<St: SagaStore>(
    State(state): State<Arc<AppState<St>>>,
) -> Result<Json<OrderStats>, ApiError> {
    Ok(Json(state.projector.statistics().await?))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderHistoryResponse {
    pub order_id: OrderId,
    pub events: Vec<StoredEvent>,
}

/// GET /state/{order_id} — raw stored event history of one order.
pub async fn state<St: SagaStore>(
    State(state): State<Arc<AppState<St>>>,
    Path(order_id): Path<String>,
) -> Result<Json<OrderHistoryResponse>, ApiError> {
    let order_id = OrderId::from(order_id);
    let events = state.projector.history(&order_id).await?;
    if events.is_empty() {
        return Err(ApiError::NotFound(format!("no events for order {order_id}")));
    }
    Ok(Json(OrderHistoryResponse { order_id, events }))
}
