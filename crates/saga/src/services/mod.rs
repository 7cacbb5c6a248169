//! External service ports the saga engine drives.
//!
//! Each port has an HTTP implementation for production and an in-memory
//! implementation with failure switches for tests.

pub mod http;
pub mod inventory;
pub mod orders;
pub mod payment;

pub use http::{HttpInventoryService, HttpOrderRecordService, HttpPaymentService};
pub use inventory::{InMemoryInventoryService, InventoryService};
pub use orders::{InMemoryOrderRecordService, OrderRecordService};
pub use payment::{InMemoryPaymentService, PaymentService};
