//! API server entry point.

use std::sync::Arc;
use std::time::Duration;

use api::config::Config;
use api::routes::sagas::AppState;
use api::{Topics, create_app, spawn_pipeline};
use event_log::{EventLog, InMemoryEventLog};
use projector::{InMemoryRecordStore, OrderProjector, PostgresRecordStore, RecordStore};
use saga::services::{
    HttpInventoryService, HttpOrderRecordService, HttpPaymentService, InMemoryInventoryService,
    InMemoryOrderRecordService, InMemoryPaymentService, InventoryService, OrderRecordService,
    PaymentService,
};
use saga::{InMemorySagaStore, SagaEngine};
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn build_record_store(config: &Config) -> Arc<dyn RecordStore> {
    match &config.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to database");
            let store = PostgresRecordStore::new(pool);
            store.run_migrations().await.expect("migrations failed");
            tracing::info!("using PostgreSQL record store");
            Arc::new(store)
        }
        None => {
            tracing::info!("no DATABASE_URL, using in-memory record store");
            Arc::new(InMemoryRecordStore::new())
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Event log, record store, and the background pipeline
    let topics = Topics {
        orders: config.orders_topic(),
        stock: config.stock_topic(),
        payments: config.payments_topic(),
    };
    let log: Arc<InMemoryEventLog> = Arc::new(InMemoryEventLog::new());
    let record_store = build_record_store(&config).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = spawn_pipeline(
        log.clone(),
        record_store.clone(),
        &topics,
        shutdown_rx,
    );

    // 4. Downstream services: HTTP when configured, in-memory otherwise
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("failed to build HTTP client");
    let inventory: Arc<dyn InventoryService> = match &config.inventory_url {
        Some(url) => Arc::new(HttpInventoryService::new(client.clone(), url.clone())),
        None => Arc::new(InMemoryInventoryService::new()),
    };
    let payment: Arc<dyn PaymentService> = match &config.payment_url {
        Some(url) => Arc::new(HttpPaymentService::new(client.clone(), url.clone())),
        None => Arc::new(InMemoryPaymentService::new()),
    };
    let orders: Arc<dyn OrderRecordService> = match &config.orders_url {
        Some(url) => Arc::new(HttpOrderRecordService::new(client, url.clone())),
        None => Arc::new(InMemoryOrderRecordService::new()),
    };

    // 5. Saga engine and application state
    let engine = SagaEngine::new(
        InMemorySagaStore::new(),
        inventory,
        payment,
        orders,
        log.clone() as Arc<dyn EventLog>,
        topics.orders.clone(),
        topics.payments.clone(),
    );
    let state = Arc::new(AppState {
        engine,
        log: log as Arc<dyn EventLog>,
        projector: OrderProjector::new(record_store),
        orders_topic: topics.orders,
    });

    // 6. Serve
    let app = create_app(state, metrics_handle);
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // 7. Drain the background loops
    let _ = shutdown_tx.send(true);
    futures_util::future::join_all(handles).await;
    tracing::info!("server shut down gracefully");
}
