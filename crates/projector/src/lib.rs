//! CQRS read side: persists every event flowing over the log verbatim and
//! rebuilds queryable order state by folding the stored events back.
//!
//! The projector subscribes to every topic with its own cursors, so it sees
//! events produced by the orchestrated and the choreographed path alike and
//! is the one place where both coordination styles converge into a single
//! read view.

pub mod error;
pub mod postgres;
pub mod projection;
pub mod store;
pub mod subscriber;

pub use error::ProjectorError;
pub use postgres::PostgresRecordStore;
pub use projection::{OrderProjection, OrderProjector, OrderStats, OrderStatus};
pub use store::{InMemoryRecordStore, RecordStore, StoredEvent};
pub use subscriber::ProjectorSubscriber;
