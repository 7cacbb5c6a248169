use common::events::{OrderCreatedPayload, StockReservedPayload};

/// Outcome of a participant's local decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Approve,
    Reject { reason: String },
}

impl PolicyDecision {
    pub fn reject(reason: impl Into<String>) -> Self {
        Self::Reject {
            reason: reason.into(),
        }
    }
}

/// Decides whether stock gets reserved for a newly created order.
pub trait ReservationPolicy: Send + Sync {
    fn decide(&self, order: &OrderCreatedPayload) -> PolicyDecision;
}

/// Decides whether payment is authorized for a reserved order.
pub trait AuthorizationPolicy: Send + Sync {
    fn decide(&self, reservation: &StockReservedPayload) -> PolicyDecision;
}

/// The default policy: every order passes. The choreographed path performs
/// no real availability or credit check; rejection branches exist for
/// policies that do.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysApprove;

impl ReservationPolicy for AlwaysApprove {
    fn decide(&self, _order: &OrderCreatedPayload) -> PolicyDecision {
        PolicyDecision::Approve
    }
}

impl AuthorizationPolicy for AlwaysApprove {
    fn decide(&self, _reservation: &StockReservedPayload) -> PolicyDecision {
        PolicyDecision::Approve
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{ClientId, OrderId, OrderItem};

    #[test]
    fn always_approve_approves() {
        let order = OrderCreatedPayload {
            order_id: OrderId::from("order-1"),
            client_id: ClientId::new(1),
            items: vec![OrderItem::new(1, 1)],
            total: 10.0,
            shipping_address: String::new(),
            billing_address: String::new(),
        };
        assert_eq!(
            ReservationPolicy::decide(&AlwaysApprove, &order),
            PolicyDecision::Approve
        );
    }
}
