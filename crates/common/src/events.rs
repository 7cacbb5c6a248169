//! Wire-level payloads of the domain events exchanged over the event log.
//!
//! Each event record carries its type tag and timestamp in the envelope; the
//! structs here describe only the `payload` object. Field names are camelCase
//! on the wire, matching what the downstream services emit and consume.

use serde::{Deserialize, Serialize};

use crate::types::{ClientId, OrderId, OrderItem};

/// Event type tags, as they appear in the record envelope.
pub mod event_types {
    pub const ORDER_CREATED: &str = "OrderCreated";
    pub const ORDER_UPDATED: &str = "OrderUpdated";
    pub const ORDER_CONFIRMED: &str = "OrderConfirmed";
    pub const ORDER_CANCELLED: &str = "OrderCancelled";
    pub const STOCK_RESERVED: &str = "StockReserved";
    pub const STOCK_RESERVATION_FAILED: &str = "StockReservationFailed";
    pub const PAYMENT_AUTHORIZED: &str = "PaymentAuthorized";
    pub const PAYMENT_FAILED: &str = "PaymentFailed";
}

/// Payload of `OrderCreated` — initiates the choreographed chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedPayload {
    pub order_id: OrderId,
    pub client_id: ClientId,
    pub items: Vec<OrderItem>,
    pub total: f64,
    #[serde(default)]
    pub shipping_address: String,
    #[serde(default)]
    pub billing_address: String,
}

/// Payload of `OrderUpdated` — overwrites the mutable order fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdatedPayload {
    pub order_id: OrderId,
    pub items: Vec<OrderItem>,
    pub total: f64,
    #[serde(default)]
    pub shipping_address: String,
    #[serde(default)]
    pub billing_address: String,
}

/// Payload of `StockReserved`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockReservedPayload {
    pub order_id: OrderId,
    pub items: Vec<OrderItem>,
}

/// Payload of `StockReservationFailed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockReservationFailedPayload {
    pub order_id: OrderId,
    pub items: Vec<OrderItem>,
    pub reason: String,
}

/// Payload of `PaymentAuthorized`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAuthorizedPayload {
    pub order_id: OrderId,
}

/// Payload of `PaymentFailed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFailedPayload {
    pub order_id: OrderId,
    pub reason: String,
}

/// Payload of `OrderConfirmed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmedPayload {
    pub order_id: OrderId,
}

/// Payload of `OrderCancelled`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCancelledPayload {
    pub order_id: OrderId,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_created_wire_fields_are_camel_case() {
        let payload = OrderCreatedPayload {
            order_id: OrderId::new("o-1"),
            client_id: ClientId::new(7),
            items: vec![OrderItem::new(1, 2)],
            total: 40.0,
            shipping_address: "12 rue de la Paix".to_string(),
            billing_address: String::new(),
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["orderId"], "o-1");
        assert_eq!(json["clientId"], 7);
        assert_eq!(json["total"], 40.0);
        assert_eq!(json["items"][0]["sku"], 1);
        assert_eq!(json["shippingAddress"], "12 rue de la Paix");
    }

    #[test]
    fn order_created_addresses_default_to_empty() {
        let json = serde_json::json!({
            "orderId": "o-2",
            "clientId": 3,
            "items": [],
            "total": 10.5
        });
        let payload: OrderCreatedPayload = serde_json::from_value(json).unwrap();
        assert_eq!(payload.shipping_address, "");
        assert_eq!(payload.billing_address, "");
    }

    #[test]
    fn cancelled_carries_reason() {
        let payload = OrderCancelledPayload {
            order_id: OrderId::new("o-3"),
            reason: "Paiement échoué".to_string(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["reason"], "Paiement échoué");
    }
}
