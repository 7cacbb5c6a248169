use serde::{Deserialize, Serialize};

/// Correlation key for an order-fulfillment attempt.
///
/// Order ids are caller-supplied and NOT guaranteed to be numeric: the
/// choreographed path generates UUIDs while the legacy order-record service
/// only understands integer ids. Components that need the numeric shape go
/// through [`OrderId::as_numeric`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Creates an order id from a raw string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the id as a decimal integer, if it has that shape.
    ///
    /// The order-record service addresses orders by integer primary key; all
    /// other components treat the id as opaque. Only all-digit ids qualify,
    /// so `"-5"` and `"+5"` are opaque, not numeric.
    pub fn as_numeric(&self) -> Option<i64> {
        if self.0.is_empty() || !self.0.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        self.0.parse().ok()
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for OrderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifier for a client (customer) of the shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(i64);

impl ClientId {
    /// Creates a client id from a raw value.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ClientId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A line item on an order: which product and how many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Product identifier.
    pub sku: u64,
    /// Quantity requested.
    #[serde(rename = "qty")]
    pub quantity: u32,
}

impl OrderItem {
    /// Creates a new order item.
    pub fn new(sku: u64, quantity: u32) -> Self {
        Self { sku, quantity }
    }
}
