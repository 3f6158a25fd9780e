//! Clients for services this one calls over HTTP.

pub mod razorpay;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Order to create on the payment provider's side.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderOrderRequest {
    /// Minor currency units (paise for INR).
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub notes: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_order(&self, request: ProviderOrderRequest) -> Result<ProviderOrder>;
}
