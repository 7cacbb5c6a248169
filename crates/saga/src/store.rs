use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::OrderId;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{Result, SagaError};
use crate::saga::{Saga, SagaId};
use crate::state::SagaState;

/// Aggregate counters over every saga the store has seen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SagaStatistics {
    pub total: u64,
    pub confirmed: u64,
    pub cancelled: u64,
    pub in_error: u64,
    /// Mean wall-clock duration of finished sagas, in milliseconds.
    pub avg_duration_ms: u64,
    /// Share of sagas that confirmed, as a percentage.
    pub success_rate: f64,
}

/// Persistence for saga records.
#[async_trait]
pub trait SagaStore: Send + Sync {
    /// Stores a newly opened saga.
    async fn insert(&self, saga: Saga) -> Result<()>;

    /// Replaces the stored record for an existing saga.
    async fn update(&self, saga: Saga) -> Result<()>;

    async fn get(&self, id: SagaId) -> Result<Option<Saga>>;

    /// All sagas started for the given order, newest first.
    async fn find_by_order(&self, order_id: &OrderId) -> Result<Vec<Saga>>;

    /// The most recently started sagas, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<Saga>>;

    async fn statistics(&self) -> Result<SagaStatistics>;
}

#[derive(Default)]
struct Inner {
    sagas: HashMap<SagaId, Saga>,
    insertion_order: Vec<SagaId>,
}

/// In-memory saga store for tests and local runs.
#[derive(Clone, Default)]
pub struct InMemorySagaStore {
    inner: Arc<RwLock<Inner>>,
    fail_on_update: Arc<AtomicBool>,
}

impl InMemorySagaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `update` fail, to exercise persistence-failure
    /// handling in tests.
    pub fn set_fail_on_update(&self, fail: bool) {
        self.fail_on_update.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SagaStore for InMemorySagaStore {
    async fn insert(&self, saga: Saga) -> Result<()> {
        let mut inner = self.inner.write().await;
        let id = saga.id();
        if inner.sagas.insert(id, saga).is_none() {
            inner.insertion_order.push(id);
        }
        Ok(())
    }

    async fn update(&self, saga: Saga) -> Result<()> {
        if self.fail_on_update.load(Ordering::SeqCst) {
            return Err(SagaError::Store("simulated store outage".to_string()));
        }
        let mut inner = self.inner.write().await;
        let id = saga.id();
        if !inner.sagas.contains_key(&id) {
            return Err(SagaError::NotFound(id));
        }
        inner.sagas.insert(id, saga);
        Ok(())
    }

    async fn get(&self, id: SagaId) -> Result<Option<Saga>> {
        let inner = self.inner.read().await;
        Ok(inner.sagas.get(&id).cloned())
    }

    async fn find_by_order(&self, order_id: &OrderId) -> Result<Vec<Saga>> {
        let inner = self.inner.read().await;
        Ok(inner
            .insertion_order
            .iter()
            .rev()
            .filter_map(|id| inner.sagas.get(id))
            .filter(|saga| saga.order_id() == order_id)
            .cloned()
            .collect())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Saga>> {
        let inner = self.inner.read().await;
        Ok(inner
            .insertion_order
            .iter()
            .rev()
            .take(limit)
            .filter_map(|id| inner.sagas.get(id))
            .cloned()
            .collect())
    }

    async fn statistics(&self) -> Result<SagaStatistics> {
        let inner = self.inner.read().await;
        let total = inner.sagas.len() as u64;
        let mut confirmed = 0u64;
        let mut cancelled = 0u64;
        let mut in_error = 0u64;
        let mut duration_sum = 0i64;
        let mut duration_count = 0u64;
        for saga in inner.sagas.values() {
            match saga.state() {
                SagaState::Confirmed => confirmed += 1,
                SagaState::Cancelled => cancelled += 1,
                SagaState::Failed => in_error += 1,
                _ => {}
            }
            // only cleanly finished runs count toward the average
            if matches!(saga.state(), SagaState::Confirmed | SagaState::Cancelled) {
                if let Some(ms) = saga.duration_ms() {
                    duration_sum += ms;
                    duration_count += 1;
                }
            }
        }
        let avg_duration_ms = if duration_count > 0 {
            (duration_sum as f64 / duration_count as f64).round() as u64
        } else {
            0
        };
        let success_rate = if total > 0 {
            (confirmed as f64 / total as f64 * 10_000.0).round() / 100.0
        } else {
            0.0
        };
        Ok(SagaStatistics {
            total,
            confirmed,
            cancelled,
            in_error,
            avg_duration_ms,
            success_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finished(order: &str, state: SagaState) -> Saga {
        let mut saga = Saga::begin(OrderId::from(order));
        saga.finish(state, None);
        saga
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let store = InMemorySagaStore::new();
        let saga = Saga::begin(OrderId::from("order-1"));
        let id = saga.id();
        store.insert(saga).await.unwrap();

        let found = store.get(id).await.unwrap().unwrap();
        assert_eq!(found.id(), id);
        assert!(store.get(SagaId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_requires_existing_saga() {
        let store = InMemorySagaStore::new();
        let saga = Saga::begin(OrderId::from("order-1"));
        let err = store.update(saga).await.unwrap_err();
        assert!(matches!(err, SagaError::NotFound(_)));
    }

    #[tokio::test]
    async fn find_by_order_returns_newest_first() {
        let store = InMemorySagaStore::new();
        let first = Saga::begin(OrderId::from("order-1"));
        let second = Saga::begin(OrderId::from("order-1"));
        let other = Saga::begin(OrderId::from("order-2"));
        let (first_id, second_id) = (first.id(), second.id());
        store.insert(first).await.unwrap();
        store.insert(other).await.unwrap();
        store.insert(second).await.unwrap();

        let found = store.find_by_order(&OrderId::from("order-1")).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id(), second_id);
        assert_eq!(found[1].id(), first_id);
    }

    #[tokio::test]
    async fn recent_honors_limit() {
        let store = InMemorySagaStore::new();
        for i in 0..5 {
            store
                .insert(Saga::begin(OrderId::from(format!("order-{i}").as_str())))
                .await
                .unwrap();
        }
        let recent = store.recent(3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].order_id().as_str(), "order-4");
        assert_eq!(recent[2].order_id().as_str(), "order-2");
    }

    #[tokio::test]
    async fn statistics_count_terminal_states() {
        let store = InMemorySagaStore::new();
        store.insert(finished("1", SagaState::Confirmed)).await.unwrap();
        store.insert(finished("2", SagaState::Confirmed)).await.unwrap();
        store.insert(finished("3", SagaState::Cancelled)).await.unwrap();
        store.insert(finished("4", SagaState::Failed)).await.unwrap();

        let stats = store.statistics().await.unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.confirmed, 2);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.in_error, 1);
        assert_eq!(stats.success_rate, 50.0);
    }

    #[tokio::test]
    async fn statistics_average_ignores_failed_runs() {
        let store = InMemorySagaStore::new();
        let mut failed = Saga::begin(OrderId::from("1"));
        std::thread::sleep(std::time::Duration::from_millis(25));
        failed.finish(SagaState::Failed, Some("store outage".into()));
        assert!(failed.duration_ms().unwrap() >= 25);
        store.insert(failed).await.unwrap();

        let stats = store.statistics().await.unwrap();
        assert_eq!(stats.in_error, 1);
        assert_eq!(stats.avg_duration_ms, 0);
    }

    #[tokio::test]
    async fn statistics_on_empty_store() {
        let store = InMemorySagaStore::new();
        let stats = store.statistics().await.unwrap();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.avg_duration_ms, 0);
    }
}
