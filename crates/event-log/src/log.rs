use std::time::Duration;

use async_trait::async_trait;

use crate::{EventRecord, Position, Result, Topic};

/// Core trait for event log implementations.
///
/// A log stores events per named topic in append order. All implementations
/// must be thread-safe (Send + Sync).
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Appends an event to the tail of a topic and returns its position.
    ///
    /// Appending never blocks on consumers. It fails only when the backing
    /// storage is unavailable; in that case the caller must retry with
    /// backoff — events are never silently dropped.
    async fn append(&self, topic: &Topic, record: EventRecord) -> Result<Position>;

    /// Reads events with a position strictly greater than `cursor`.
    ///
    /// Blocks up to `block_timeout` when no such events exist and returns an
    /// empty batch on timeout (not an error). The log keeps no per-consumer
    /// state: callers track their own cursor.
    async fn read_from(
        &self,
        topic: &Topic,
        cursor: Position,
        block_timeout: Duration,
    ) -> Result<Vec<(Position, EventRecord)>>;
}

/// Extension trait providing convenience methods for event logs.
#[async_trait]
pub trait EventLogExt: EventLog {
    /// Builds a record from a serializable payload and appends it.
    async fn publish<T: serde::Serialize + Sync>(
        &self,
        topic: &Topic,
        event_type: &str,
        payload: &T,
    ) -> Result<Position> {
        let record = EventRecord::from_payload(event_type, payload)?;
        let position = self.append(topic, record).await?;
        metrics::counter!("events_published_total", "type" => event_type.to_string()).increment(1);
        Ok(position)
    }
}

// Blanket implementation for all EventLog implementations
impl<T: EventLog + ?Sized> EventLogExt for T {}
