use std::sync::Arc;
use std::time::Duration;

use event_log::{EventLog, Position, Topic};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::store::{RecordStore, StoredEvent};

const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Feeds the record store from the event log, one task per topic.
///
/// Each topic has its own cursor; a cursor only moves past an event once the
/// store accepted it (or reported it as a duplicate), so nothing is lost and
/// duplicates fall out at the storage key.
pub struct ProjectorSubscriber {
    log: Arc<dyn EventLog>,
    store: Arc<dyn RecordStore>,
    topics: Vec<Topic>,
    poll_timeout: Duration,
    retry_delay: Duration,
    shutdown: watch::Receiver<bool>,
}

impl ProjectorSubscriber {
    pub fn new(
        log: Arc<dyn EventLog>,
        store: Arc<dyn RecordStore>,
        topics: Vec<Topic>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            log,
            store,
            topics,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
            shutdown,
        }
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Spawns one consume loop per subscribed topic.
    pub fn spawn_all(self) -> Vec<JoinHandle<()>> {
        self.topics
            .iter()
            .map(|topic| {
                tokio::spawn(consume_topic(
                    self.log.clone(),
                    self.store.clone(),
                    topic.clone(),
                    self.poll_timeout,
                    self.retry_delay,
                    self.shutdown.clone(),
                ))
            })
            .collect()
    }
}

async fn consume_topic(
    log: Arc<dyn EventLog>,
    store: Arc<dyn RecordStore>,
    topic: Topic,
    poll_timeout: Duration,
    retry_delay: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut cursor = Position::start();
    tracing::info!(%topic, "projector subscribed");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let batch = tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            result = log.read_from(&topic, cursor, poll_timeout) => result,
        };

        let batch = match batch {
            Ok(batch) => batch,
            Err(err) => {
                tracing::error!(%topic, error = %err, "projector log read failed");
                tokio::time::sleep(retry_delay).await;
                continue;
            }
        };

        for (position, record) in batch {
            let event = StoredEvent::from_record(&topic, record);
            match store.insert_if_absent(event).await {
                Ok(true) => {
                    cursor = position;
                    metrics::counter!("events_projected_total", "stream" => topic.as_str().to_string())
                        .increment(1);
                }
                Ok(false) => {
                    cursor = position;
                    metrics::counter!("events_deduplicated_total").increment(1);
                }
                Err(err) => {
                    tracing::error!(%topic, error = %err, "event store write failed");
                    tokio::time::sleep(retry_delay).await;
                    break;
                }
            }
        }
    }

    tracing::info!(%topic, "projector unsubscribed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRecordStore;
    use event_log::{EventLogExt, EventRecord, InMemoryEventLog};
    use serde_json::json;

    async fn wait_for_count(store: &InMemoryRecordStore, expected: u64) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
        while store.count().await.unwrap() < expected {
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {expected} stored events"
            );
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }

    #[tokio::test]
    async fn stores_events_from_every_topic() {
        let log = Arc::new(InMemoryEventLog::new());
        let store = Arc::new(InMemoryRecordStore::new());
        let (tx, rx) = watch::channel(false);

        let handles = ProjectorSubscriber::new(
            log.clone(),
            store.clone(),
            vec![Topic::from("orders-events"), Topic::from("stock-events")],
            rx,
        )
        .with_poll_timeout(Duration::from_millis(50))
        .spawn_all();
        assert_eq!(handles.len(), 2);

        log.publish(
            &Topic::from("orders-events"),
            "OrderCreated",
            &json!({"orderId": "1"}),
        )
        .await
        .unwrap();
        log.publish(
            &Topic::from("stock-events"),
            "StockReserved",
            &json!({"orderId": "1"}),
        )
        .await
        .unwrap();

        wait_for_count(&store, 2).await;
        let events = store
            .events_for_order(&common::OrderId::from("1"))
            .await
            .unwrap();
        assert_eq!(events.len(), 2);

        tx.send(true).unwrap();
        for handle in handles {
            tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .unwrap()
                .unwrap();
        }
    }

    #[tokio::test]
    async fn same_event_id_on_two_topics_is_stored_once() {
        let log = Arc::new(InMemoryEventLog::new());
        let store = Arc::new(InMemoryRecordStore::new());
        let (tx, rx) = watch::channel(false);

        ProjectorSubscriber::new(
            log.clone(),
            store.clone(),
            vec![Topic::from("orders-events"), Topic::from("stock-events")],
            rx,
        )
        .with_poll_timeout(Duration::from_millis(50))
        .spawn_all();

        let record = EventRecord::new("OrderCreated", json!({"orderId": "1"}));
        log.append(&Topic::from("orders-events"), record.clone())
            .await
            .unwrap();
        log.append(&Topic::from("stock-events"), record)
            .await
            .unwrap();

        wait_for_count(&store, 1).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.count().await.unwrap(), 1);

        tx.send(true).unwrap();
    }
}
