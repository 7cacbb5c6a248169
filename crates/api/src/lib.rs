//! HTTP API server for the order-fulfillment coordination layer.
//!
//! Exposes the orchestrated saga engine, the choreographed command entry
//! point, and the projector's read side — with structured logging (tracing)
//! and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use choreography::{
    AlwaysApprove, InventoryReservationHandler, OrderConfirmationHandler, Participant,
    PaymentAuthorizationHandler,
};
use event_log::{EventLog, InMemoryEventLog, Topic};
use metrics_exporter_prometheus::PrometheusHandle;
use projector::{InMemoryRecordStore, OrderProjector, ProjectorSubscriber, RecordStore};
use saga::services::{
    InMemoryInventoryService, InMemoryOrderRecordService, InMemoryPaymentService,
};
use saga::{SagaEngine, SagaStore};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::sagas::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<St: SagaStore + 'static>(
    state: Arc<AppState<St>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/api/sagas", post(routes::sagas::start::<St>))
        .route("/api/sagas/stats", get(routes::sagas::stats::<St>))
        .route("/api/sagas/recent", get(routes::sagas::recent::<St>))
        .route("/api/sagas/{saga_id}", get(routes::sagas::get::<St>))
        .route(
            "/api/orders/{order_id}/sagas",
            get(routes::sagas::by_order::<St>),
        )
        .route(
            "/api/commands/orders",
            post(routes::commands::create_order::<St>),
        )
        .route("/projection/{order_id}", get(routes::queries::projection::<St>))
        .route(
            "/orders-by-client/{client_id}",
            get(routes::queries::orders_by_client::<St>),
        )
        .route("/order-stats", get(routes::queries::order_stats::<St>))
        .route("/state/{order_id}", get(routes::queries::state::<St>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Topics the pipeline runs over.
#[derive(Clone)]
pub struct Topics {
    pub orders: Topic,
    pub stock: Topic,
    pub payments: Topic,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            orders: Topic::from("orders-events"),
            stock: Topic::from("stock-events"),
            payments: Topic::from("payments-events"),
        }
    }
}

/// Spawns the choreography participants and the projector subscriber.
///
/// Everything stops when `true` is sent on the returned channel's sender.
pub fn spawn_pipeline(
    log: Arc<dyn EventLog>,
    record_store: Arc<dyn RecordStore>,
    topics: &Topics,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    let inventory = Arc::new(InventoryReservationHandler::new(
        log.clone(),
        topics.orders.clone(),
        topics.stock.clone(),
        Arc::new(AlwaysApprove),
    ));
    let payment = Arc::new(PaymentAuthorizationHandler::new(
        log.clone(),
        topics.stock.clone(),
        topics.payments.clone(),
        Arc::new(AlwaysApprove),
    ));
    let confirmation = Arc::new(OrderConfirmationHandler::new(
        log.clone(),
        topics.payments.clone(),
        topics.orders.clone(),
    ));

    let mut handles: Vec<JoinHandle<()>> = vec![
        tokio::spawn(Participant::new(log.clone(), inventory, shutdown.clone()).run()),
        tokio::spawn(Participant::new(log.clone(), payment, shutdown.clone()).run()),
        tokio::spawn(Participant::new(log.clone(), confirmation, shutdown.clone()).run()),
    ];

    handles.extend(
        ProjectorSubscriber::new(
            log,
            record_store,
            vec![
                topics.orders.clone(),
                topics.stock.clone(),
                topics.payments.clone(),
            ],
            shutdown,
        )
        .spawn_all(),
    );

    handles
}

/// Fully in-memory application state, with the pipeline already running.
pub struct DefaultState {
    pub state: Arc<AppState<saga::InMemorySagaStore>>,
    pub log: Arc<InMemoryEventLog>,
    pub record_store: Arc<InMemoryRecordStore>,
    pub inventory: InMemoryInventoryService,
    pub payment: InMemoryPaymentService,
    pub orders: InMemoryOrderRecordService,
    pub shutdown: watch::Sender<bool>,
    pub handles: Vec<JoinHandle<()>>,
}

/// Creates in-memory state with mock downstream services and spawns the
/// choreography and projector loops. Must run inside a Tokio runtime.
pub fn create_default_state() -> DefaultState {
    let topics = Topics::default();
    let log = Arc::new(InMemoryEventLog::new());
    let record_store = Arc::new(InMemoryRecordStore::new());
    let inventory = InMemoryInventoryService::new();
    let payment = InMemoryPaymentService::new();
    let orders = InMemoryOrderRecordService::new();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = spawn_pipeline(
        log.clone(),
        record_store.clone(),
        &topics,
        shutdown_rx,
    );

    let engine = SagaEngine::new(
        saga::InMemorySagaStore::new(),
        Arc::new(inventory.clone()),
        Arc::new(payment.clone()),
        Arc::new(orders.clone()),
        log.clone(),
        topics.orders.clone(),
        topics.payments.clone(),
    );

    let state = Arc::new(AppState {
        engine,
        log: log.clone() as Arc<dyn EventLog>,
        projector: OrderProjector::new(record_store.clone() as Arc<dyn RecordStore>),
        orders_topic: topics.orders.clone(),
    });

    DefaultState {
        state,
        log,
        record_store,
        inventory,
        payment,
        orders,
        shutdown: shutdown_tx,
        handles,
    }
}
