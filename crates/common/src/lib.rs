//! Shared types for the order-fulfillment coordination system.
//!
//! This crate holds the identifiers and wire-level event payloads used by
//! every other crate: the saga engine, the choreography participants, and
//! the event-store projector all speak the same event shapes.

pub mod events;
pub mod types;

pub use events::{
    OrderCancelledPayload, OrderConfirmedPayload, OrderCreatedPayload, OrderUpdatedPayload,
    PaymentAuthorizedPayload, PaymentFailedPayload, StockReservationFailedPayload,
    StockReservedPayload, event_types,
};
pub use types::{ClientId, OrderId, OrderItem};
