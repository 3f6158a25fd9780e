use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use crate::api::{PaymentProvider, ProviderOrder, ProviderOrderRequest};

/// Razorpay Orders API client, authenticated with the key pair.
#[derive(Clone)]
pub struct RazorpayClient {
    http_client: Client,
    api_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(
        http_client: Client,
        api_url: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            api_url: api_url.into(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        }
    }
}

#[async_trait]
impl PaymentProvider for RazorpayClient {
    async fn create_order(&self, request: ProviderOrderRequest) -> Result<ProviderOrder> {
        let order: ProviderOrder = self
            .http_client
            .post(format!("{}/v1/orders", self.api_url.trim_end_matches('/')))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&request)
            .send()
            .await
            .context("Failed to reach Razorpay")?
            .error_for_status()
            .context("Razorpay rejected the order")?
            .json()
            .await
            .context("Failed to parse JSON")?;

        tracing::debug!(
            "Razorpay order {} created for receipt {}",
            order.id,
            request.receipt
        );

        Ok(order)
    }
}
