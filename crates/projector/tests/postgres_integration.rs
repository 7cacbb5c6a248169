//! PostgreSQL integration tests for the record store.
//!
//! A single shared container backs every test; each test truncates the
//! table, so they are serialized.
//!
//! ```bash
//! cargo test -p projector --test postgres_integration
//! ```

use std::sync::Arc;

use chrono::Utc;
use common::{ClientId, OrderId};
use event_log::EventId;
use projector::{OrderProjector, OrderStatus, PostgresRecordStore, RecordStore, StoredEvent};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // container must stay alive for the test run
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();
            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();
            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresRecordStore::new(pool.clone())
                .run_migrations()
                .await
                .unwrap();
            pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_test_store() -> PostgresRecordStore {
    let info = get_container_info().await;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE stored_events")
        .execute(&pool)
        .await
        .unwrap();

    PostgresRecordStore::new(pool)
}

fn stored(event_type: &str, payload: serde_json::Value) -> StoredEvent {
    StoredEvent {
        id: EventId::new(),
        stream: "orders-events".to_string(),
        event_type: event_type.to_string(),
        timestamp: Utc::now(),
        payload,
    }
}

#[tokio::test]
#[serial]
async fn insert_and_read_back_in_insertion_order() {
    let store = get_test_store().await;

    store
        .insert_if_absent(stored(
            "OrderCreated",
            serde_json::json!({"orderId": "1", "clientId": 7, "items": [], "total": 10.0}),
        ))
        .await
        .unwrap();
    store
        .insert_if_absent(stored(
            "PaymentAuthorized",
            serde_json::json!({"orderId": "1"}),
        ))
        .await
        .unwrap();

    let events = store
        .events_for_order(&OrderId::from("1"))
        .await
        .unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, "OrderCreated");
    assert_eq!(events[1].event_type, "PaymentAuthorized");
    assert_eq!(events[0].stream, "orders-events");
}

#[tokio::test]
#[serial]
async fn duplicate_event_ids_are_ignored() {
    let store = get_test_store().await;

    let event = stored("OrderCreated", serde_json::json!({"orderId": "1"}));
    let duplicate = event.clone();

    assert!(store.insert_if_absent(event).await.unwrap());
    assert!(!store.insert_if_absent(duplicate).await.unwrap());
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
#[serial]
async fn filters_by_client_and_event_type() {
    let store = get_test_store().await;

    store
        .insert_if_absent(stored(
            "OrderCreated",
            serde_json::json!({"orderId": "1", "clientId": 7, "items": [], "total": 10.0}),
        ))
        .await
        .unwrap();
    store
        .insert_if_absent(stored(
            "OrderCreated",
            serde_json::json!({"orderId": "2", "clientId": 8, "items": [], "total": 20.0}),
        ))
        .await
        .unwrap();
    store
        .insert_if_absent(stored(
            "StockReserved",
            serde_json::json!({"orderId": "1", "items": []}),
        ))
        .await
        .unwrap();

    let for_client = store.events_for_client(ClientId::new(7)).await.unwrap();
    assert_eq!(for_client.len(), 1);
    assert_eq!(for_client[0].payload["orderId"], "1");

    let created = store.events_of_types(&["OrderCreated"]).await.unwrap();
    assert_eq!(created.len(), 2);
}

#[tokio::test]
#[serial]
async fn projection_folds_from_postgres() {
    let store = Arc::new(get_test_store().await);

    store
        .insert_if_absent(stored(
            "OrderCreated",
            serde_json::json!({
                "orderId": "1",
                "clientId": 7,
                "items": [{"sku": 1, "qty": 2}],
                "total": 59.9,
            }),
        ))
        .await
        .unwrap();
    store
        .insert_if_absent(stored(
            "PaymentAuthorized",
            serde_json::json!({"orderId": "1"}),
        ))
        .await
        .unwrap();

    let projector = OrderProjector::new(store);
    let projection = projector
        .project(&OrderId::from("1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(projection.status, OrderStatus::Confirmed);
    assert_eq!(projection.total, 59.9);

    let stats = projector.statistics().await.unwrap();
    assert_eq!(stats.total_orders, 1);
    assert_eq!(stats.total_revenue, 59.9);
}
