//! Choreographed fulfillment: decentralized participants that react to
//! events on one topic and publish the derived event to the next, forming
//! the chain `OrderCreated -> StockReserved -> PaymentAuthorized ->
//! OrderConfirmed` (with failure branches ending in `OrderCancelled`).
//!
//! There is no coordinator on this path; each participant only knows its
//! input topic, its output topic, and its local decision policy.

pub mod dedup;
pub mod error;
pub mod handlers;
pub mod participant;
pub mod policy;

pub use dedup::IdempotencyKeys;
pub use error::ChoreographyError;
pub use handlers::{
    InventoryReservationHandler, OrderConfirmationHandler, PaymentAuthorizationHandler,
};
pub use participant::{EventHandler, Participant};
pub use policy::{
    AlwaysApprove, AuthorizationPolicy, PolicyDecision, ReservationPolicy,
};
