//! Orchestrated saga engine for order fulfillment.
//!
//! A saga walks an order through four sequential steps (stock verification,
//! stock reservation, payment, confirmation). When a step fails, previously
//! completed steps are compensated in reverse order and the saga ends in a
//! terminal `CANCELLED` state. Terminal outcomes are appended to the event
//! log so downstream consumers observe them.

pub mod engine;
pub mod error;
pub mod saga;
pub mod services;
pub mod state;
pub mod store;

pub use engine::{OrderContext, SagaEngine};
pub use error::SagaError;
pub use saga::{Saga, SagaId, StepRecord, StepStatus};
pub use state::SagaState;
pub use store::{InMemorySagaStore, SagaStatistics, SagaStore};
