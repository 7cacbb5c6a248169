use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, RwLock};
use tokio::time::Instant;

use crate::{EventLog, EventRecord, Position, Result, Topic};

/// In-memory event log implementation.
///
/// Topics materialize on first append. Blocking reads park on a [`Notify`]
/// that every append wakes; the waiter is registered before the availability
/// check so a concurrent append cannot slip through unobserved.
#[derive(Clone, Default)]
pub struct InMemoryEventLog {
    topics: Arc<RwLock<HashMap<String, Vec<EventRecord>>>>,
    appended: Arc<Notify>,
}

impl InMemoryEventLog {
    /// Creates a new empty in-memory log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of events in a topic.
    pub async fn len(&self, topic: &Topic) -> usize {
        self.topics
            .read()
            .await
            .get(topic.as_str())
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Returns true if the topic holds no events.
    pub async fn is_empty(&self, topic: &Topic) -> bool {
        self.len(topic).await == 0
    }

    async fn collect_after(
        &self,
        topic: &Topic,
        cursor: Position,
    ) -> Vec<(Position, EventRecord)> {
        let topics = self.topics.read().await;
        let Some(entries) = topics.get(topic.as_str()) else {
            return Vec::new();
        };
        // Positions are 1-based indices into the topic vector.
        entries
            .iter()
            .enumerate()
            .map(|(i, record)| (Position::new(i as u64 + 1), record.clone()))
            .filter(|(position, _)| *position > cursor)
            .collect()
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(&self, topic: &Topic, record: EventRecord) -> Result<Position> {
        let mut topics = self.topics.write().await;
        let entries = topics.entry(topic.as_str().to_string()).or_default();
        entries.push(record);
        let position = Position::new(entries.len() as u64);
        drop(topics);

        self.appended.notify_waiters();
        Ok(position)
    }

    async fn read_from(
        &self,
        topic: &Topic,
        cursor: Position,
        block_timeout: Duration,
    ) -> Result<Vec<(Position, EventRecord)>> {
        let deadline = Instant::now() + block_timeout;

        loop {
            let notified = self.appended.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let batch = self.collect_after(topic, cursor).await;
            if !batch.is_empty() {
                return Ok(batch);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(Vec::new());
            }
            if tokio::time::timeout(remaining, notified).await.is_err() {
                return Ok(Vec::new());
            }
        }
    }
}
