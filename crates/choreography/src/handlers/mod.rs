//! The three participants forming the fulfillment chain.

pub mod inventory;
pub mod orders;
pub mod payment;

pub use inventory::InventoryReservationHandler;
pub use orders::OrderConfirmationHandler;
pub use payment::PaymentAuthorizationHandler;
