//! Saga orchestration endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use event_log::{EventLog, Topic};
use projector::OrderProjector;
use saga::{OrderContext, Saga, SagaEngine, SagaId, SagaState, SagaStore};
use serde::Deserialize;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<St: SagaStore> {
    pub engine: SagaEngine<St>,
    pub log: Arc<dyn EventLog>,
    pub projector: OrderProjector,
    pub orders_topic: Topic,
}

const DEFAULT_RECENT_LIMIT: usize = 20;

#[derive(Deserialize)]
pub struct RecentParams {
    pub limit: Option<usize>,
}

/// POST /api/sagas — runs a fulfillment saga to completion.
///
/// A confirmed saga comes back as 200 with the full record. A saga that ran
/// but ended `CANCELLED` or `FAILED` comes back as 500 carrying the saga id
/// and state, so the caller can inspect the record.
pub async fn start<St: SagaStore>(
    State(state): State<Arc<AppState<St>>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, ApiError> {
    // missing or mis-typed fields are the caller's fault, not a 422
    let ctx: OrderContext = serde_json::from_value(body)
        .map_err(|err| ApiError::BadRequest(format!("invalid saga request: {err}")))?;
    let saga = state.engine.start(ctx).await?;

    if saga.state() == SagaState::Confirmed {
        return Ok(Json(saga).into_response());
    }

    let body = serde_json::json!({
        "error": saga.last_error().unwrap_or("saga did not confirm"),
        "sagaId": saga.id(),
        "state": saga.state(),
    });
    Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response())
}

/// GET /api/sagas/{saga_id}
pub async fn get<St: SagaStore>(
    State(state): State<Arc<AppState<St>>>,
    Path(saga_id): Path<String>,
) -> Result<Json<Saga>, ApiError> {
    let saga_id: SagaId = saga_id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid saga id: {saga_id}")))?;
    let saga = state
        .engine
        .get_saga(saga_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("saga not found: {saga_id}")))?;
    Ok(Json(saga))
}

/// GET /api/orders/{order_id}/sagas
pub async fn by_order<St: SagaStore>(
    State(state): State<Arc<AppState<St>>>,
    Path(order_id): Path<String>,
) -> Result<Json<Vec<Saga>>, ApiError> {
    let sagas = state
        .engine
        .sagas_for_order(&common::OrderId::from(order_id))
        .await?;
    Ok(Json(sagas))
}

/// GET /api/sagas/recent?limit=N
pub async fn recent<St: SagaStore>(
    State(state): State<Arc<AppState<St>>>,
    Query(params): Query<RecentParams>,
) -> Result<Json<Vec<Saga>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    let sagas = state.engine.recent_sagas(limit).await?;
    Ok(Json(sagas))
}

/// GET /api/sagas/stats
pub async fn stats<St: SagaStore>(
    State(state): State<Arc<AppState<St>>>,
) -> Result<Json<saga::SagaStatistics>, ApiError> {
    Ok(Json(state.engine.statistics().await?))
}
