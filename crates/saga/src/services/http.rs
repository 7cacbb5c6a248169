//! HTTP implementations of the service ports, speaking JSON to the
//! downstream microservices.

use async_trait::async_trait;
use common::{OrderId, OrderItem};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SagaError};

use super::inventory::InventoryService;
use super::orders::OrderRecordService;
use super::payment::PaymentService;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest<'a> {
    items: &'a [OrderItem],
}

#[derive(Deserialize)]
struct VerifyResponse {
    available: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReserveRequest<'a> {
    order_id: &'a OrderId,
    items: &'a [OrderItem],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderOnlyRequest<'a> {
    order_id: &'a OrderId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChargeRequest<'a> {
    order_id: &'a OrderId,
    amount: f64,
    method: &'a str,
}

#[derive(Serialize)]
struct SetStateRequest<'a> {
    state: &'a str,
}

/// Stock service client.
#[derive(Clone)]
pub struct HttpInventoryService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpInventoryService {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl InventoryService for HttpInventoryService {
    async fn verify(&self, items: &[OrderItem]) -> Result<bool> {
        let response = self
            .client
            .post(format!("{}/verify", self.base_url))
            .json(&VerifyRequest { items })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SagaError::Inventory(e.to_string()))?;
        let body: VerifyResponse = response
            .json()
            .await
            .map_err(|e| SagaError::Inventory(e.to_string()))?;
        Ok(body.available)
    }

    async fn reserve(&self, order_id: &OrderId, items: &[OrderItem]) -> Result<()> {
        self.client
            .post(format!("{}/reserve", self.base_url))
            .json(&ReserveRequest { order_id, items })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SagaError::Inventory(e.to_string()))?;
        Ok(())
    }

    async fn release(&self, order_id: &OrderId) -> Result<()> {
        self.client
            .post(format!("{}/release", self.base_url))
            .json(&OrderOnlyRequest { order_id })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SagaError::Inventory(e.to_string()))?;
        Ok(())
    }
}

/// Payment service client.
#[derive(Clone)]
pub struct HttpPaymentService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPaymentService {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl PaymentService for HttpPaymentService {
    async fn charge(&self, order_id: &OrderId, amount: f64, method: &str) -> Result<()> {
        self.client
            .post(format!("{}/charge", self.base_url))
            .json(&ChargeRequest {
                order_id,
                amount,
                method,
            })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SagaError::Payment(e.to_string()))?;
        Ok(())
    }

    async fn cancel(&self, order_id: &OrderId) -> Result<()> {
        self.client
            .post(format!("{}/cancel", self.base_url))
            .json(&OrderOnlyRequest { order_id })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SagaError::Payment(e.to_string()))?;
        Ok(())
    }
}

/// Legacy order-record service client.
#[derive(Clone)]
pub struct HttpOrderRecordService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpOrderRecordService {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl OrderRecordService for HttpOrderRecordService {
    async fn set_state(&self, order_id: i64, state: &str) -> Result<()> {
        self.client
            .put(format!("{}/orders/{}/state", self.base_url, order_id))
            .json(&SetStateRequest { state })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SagaError::OrderRecord(e.to_string()))?;
        Ok(())
    }
}
