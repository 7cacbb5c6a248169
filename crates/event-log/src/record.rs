use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an event.
///
/// Ids are generated by the producer, not assigned by the log, and are
/// globally unique across all topics. Consumers use them to suppress
/// duplicate effects from at-least-once re-delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an event id from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EventId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Position of an event within a single topic.
///
/// Positions are strictly increasing per topic and carry no meaning across
/// topics. [`Position::start`] sits before the first event, so a read from it
/// returns everything.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Position(u64);

impl Position {
    /// Creates a position from a raw value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the cursor position before the first event of a topic.
    pub fn start() -> Self {
        Self(0)
    }

    /// Returns the raw position value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named stream within the log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    /// Creates a topic from its name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the topic name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Topic {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// An event as it travels over the log.
///
/// Wire shape: `{id, type, timestamp, payload}`. The payload is opaque to the
/// log; producers and consumers agree on its structure out of band (see the
/// payload types in `common::events`). Records are immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Producer-generated unique id, used for consumer-side deduplication.
    pub id: EventId,

    /// The event type tag (e.g. "OrderCreated").
    #[serde(rename = "type")]
    pub event_type: String,

    /// When the producer created the event.
    pub timestamp: DateTime<Utc>,

    /// The event payload as JSON.
    pub payload: serde_json::Value,
}

impl EventRecord {
    /// Creates a record with a fresh id and the current timestamp.
    pub fn new(event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: EventId::new(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Creates a record from a serializable payload.
    pub fn from_payload<T: serde::Serialize>(
        event_type: impl Into<String>,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(event_type, serde_json::to_value(payload)?))
    }

    /// Replaces the generated id (used to model producer-side retries).
    pub fn with_id(mut self, id: EventId) -> Self {
        self.id = id;
        self
    }

    /// Deserializes the payload into a concrete type.
    pub fn payload_as<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_ids_are_unique() {
        assert_ne!(EventId::new(), EventId::new());
    }

    #[test]
    fn position_ordering() {
        assert!(Position::start() < Position::new(1));
        assert!(Position::new(1) < Position::new(2));
    }

    #[test]
    fn record_wire_shape() {
        let record = EventRecord::new("OrderCreated", serde_json::json!({"orderId": "o-1"}));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["type"], "OrderCreated");
        assert!(json["id"].as_str().is_some());
        assert!(json["timestamp"].as_str().is_some());
        assert_eq!(json["payload"]["orderId"], "o-1");
    }

    #[test]
    fn record_from_payload_roundtrip() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct P {
            value: i32,
        }

        let record = EventRecord::from_payload("Test", &P { value: 3 }).unwrap();
        let back: P = record.payload_as().unwrap();
        assert_eq!(back, P { value: 3 });
    }
}
