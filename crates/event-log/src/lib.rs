//! Append-only, per-topic event log.
//!
//! The log is the sole cross-component communication channel apart from the
//! orchestrator's direct service calls. Each topic is an independent stream:
//! ordering is guaranteed only within a topic, readers own their cursors, and
//! there is no consumer-group concept — two readers with separate cursors each
//! observe every event (broadcast semantics).

pub mod error;
pub mod log;
pub mod memory;
pub mod record;

pub use error::{EventLogError, Result};
pub use log::{EventLog, EventLogExt};
pub use memory::InMemoryEventLog;
pub use record::{EventId, EventRecord, Position, Topic};
