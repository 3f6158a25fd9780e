//! Online payments through the provider's checkout, plus the user's saved
//! payment methods.
//!
//! Verification follows a record-then-fail pattern: a bad signature first
//! marks the order and its transaction as failed, then reports the failure.

use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    api::{PaymentProvider, ProviderOrderRequest},
    app_error::AppError,
    config::PaymentsConfig,
    domain::{
        Order, PaymentMethodType, PaymentStatus, PaymentUpdate, SavedPaymentMethod, Transaction,
        TransactionStatus, TransactionUpdate,
    },
    repositories::{OrderRepository, PaymentMethodRepository, TransactionRepository},
    services::fulfillment::FulfillmentService,
};

type HmacSha256 = Hmac<Sha256>;

const PROVIDER_NAME: &str = "razorpay";

/// What the client needs to open the provider's payment sheet.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProviderCheckout {
    /// Provider-side order id.
    pub order_id: String,
    /// Minor currency units.
    pub amount: i64,
    pub currency: String,
    /// Publishable key id.
    pub key_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyPayment {
    pub order_id: Uuid,
    #[serde(alias = "razorpay_order_id")]
    pub provider_order_id: String,
    #[serde(alias = "razorpay_payment_id")]
    pub provider_payment_id: String,
    #[serde(alias = "razorpay_signature")]
    pub provider_signature: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SavePaymentMethod {
    /// One of `upi`, `card`, `netbanking`, `wallet`.
    pub method_type: String,
    pub card_last4: Option<String>,
    pub card_network: Option<String>,
    pub upi_id: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

fn signing_mac(
    secret: &str,
    provider_order_id: &str,
    provider_payment_id: &str,
) -> anyhow::Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|err| anyhow!("Invalid signing key: {err}"))?;
    mac.update(format!("{provider_order_id}|{provider_payment_id}").as_bytes());
    Ok(mac)
}

/// Hex-encoded HMAC-SHA256 of `<provider_order_id>|<provider_payment_id>`.
pub fn payment_signature(
    secret: &str,
    provider_order_id: &str,
    provider_payment_id: &str,
) -> anyhow::Result<String> {
    let mac = signing_mac(secret, provider_order_id, provider_payment_id)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a signature against [`payment_signature`].
/// Anything but lowercase hex never matches.
pub fn signature_matches(
    secret: &str,
    provider_order_id: &str,
    provider_payment_id: &str,
    signature: &str,
) -> anyhow::Result<bool> {
    if signature.bytes().any(|b| b.is_ascii_uppercase()) {
        return Ok(false);
    }
    let Ok(signature) = hex::decode(signature) else {
        return Ok(false);
    };

    let mac = signing_mac(secret, provider_order_id, provider_payment_id)?;
    Ok(mac.verify_slice(&signature).is_ok())
}

/// Amount in minor currency units, truncated.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0) as i64
}

#[derive(Clone)]
pub struct PaymentService {
    orders: Arc<dyn OrderRepository>,
    transactions: Arc<dyn TransactionRepository>,
    methods: Arc<dyn PaymentMethodRepository>,
    fulfillment: FulfillmentService,
    provider: Option<Arc<dyn PaymentProvider>>,
    config: PaymentsConfig,
}

impl PaymentService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        transactions: Arc<dyn TransactionRepository>,
        methods: Arc<dyn PaymentMethodRepository>,
        fulfillment: FulfillmentService,
        provider: Option<Arc<dyn PaymentProvider>>,
        config: PaymentsConfig,
    ) -> Self {
        Self {
            orders,
            transactions,
            methods,
            fulfillment,
            provider,
            config,
        }
    }

    pub async fn create_provider_order(
        &self,
        order_id: Uuid,
        user_id: Uuid,
    ) -> Result<ProviderCheckout, AppError> {
        let order = self.owned_order(order_id, user_id).await?;

        let (Some(provider), Some(key_id)) = (&self.provider, &self.config.key_id) else {
            return Err(not_configured());
        };

        let provider_order = provider
            .create_order(ProviderOrderRequest {
                amount: to_minor_units(order.total_amount),
                currency: self.config.currency.clone(),
                receipt: order.id.to_string(),
                notes: json!({
                    "order_id": order.id,
                    "user_id": user_id,
                }),
            })
            .await
            .map_err(|err| {
                tracing::warn!("Payment provider failed for order #{}: {:?}", order.id, err);
                AppError::ServiceUnreachable("Payment provider".to_string())
            })?;

        self.orders
            .set_provider_order(order.id, &provider_order.id)
            .await?;

        let now = Utc::now();
        self.transactions
            .insert(&Transaction {
                id: Uuid::new_v4(),
                user_id,
                order_id: order.id,
                amount: order.total_amount,
                payment_method: PROVIDER_NAME.to_string(),
                status: TransactionStatus::Initiated,
                provider_order_id: Some(provider_order.id.clone()),
                provider_payment_id: None,
                provider_signature: None,
                error_message: None,
                created_at: now,
                updated_at: now,
            })
            .await?;

        tracing::info!(
            "Provider order {} created for order #{}",
            provider_order.id,
            order.id
        );

        Ok(ProviderCheckout {
            order_id: provider_order.id,
            amount: provider_order.amount,
            currency: provider_order.currency,
            key_id: key_id.clone(),
        })
    }

    /// Checks the provider's signature and settles the order.
    ///
    /// A provider order id other than the one recorded on the order counts as
    /// a forged signature.
    pub async fn verify(&self, req: VerifyPayment, user_id: Uuid) -> Result<Order, AppError> {
        let secret = self
            .config
            .key_secret
            .as_deref()
            .ok_or_else(not_configured)?;

        let order = self.owned_order(req.order_id, user_id).await?;

        let signature_valid = signature_matches(
            secret,
            &req.provider_order_id,
            &req.provider_payment_id,
            &req.provider_signature,
        )?;
        let provider_order_matches =
            order.provider_order_id.as_deref() == Some(req.provider_order_id.as_str());

        if !provider_order_matches || !signature_valid {
            tracing::warn!(
                "Payment signature mismatch for order #{} (provider order {})",
                order.id,
                req.provider_order_id
            );

            self.orders
                .record_payment(
                    order.id,
                    PaymentUpdate {
                        status: PaymentStatus::Failed,
                        provider_payment_id: None,
                        provider_signature: None,
                    },
                )
                .await?;
            // Only the transaction opened for this order is touched, whatever
            // provider order id the caller sent.
            if let Some(provider_order_id) = order.provider_order_id.as_deref() {
                self.transactions
                    .update_by_provider_order(
                        order.id,
                        user_id,
                        provider_order_id,
                        TransactionUpdate {
                            status: TransactionStatus::Failed,
                            provider_payment_id: None,
                            provider_signature: None,
                            error_message: Some("Signature verification failed".to_string()),
                        },
                    )
                    .await?;
            }

            return Err(AppError::VerificationFailed(
                "Payment verification failed".to_string(),
            ));
        }

        self.orders
            .record_payment(
                order.id,
                PaymentUpdate {
                    status: PaymentStatus::Completed,
                    provider_payment_id: Some(req.provider_payment_id.clone()),
                    provider_signature: Some(req.provider_signature.clone()),
                },
            )
            .await?;
        self.transactions
            .update_by_provider_order(
                order.id,
                user_id,
                &req.provider_order_id,
                TransactionUpdate {
                    status: TransactionStatus::Success,
                    provider_payment_id: Some(req.provider_payment_id),
                    provider_signature: Some(req.provider_signature),
                    error_message: None,
                },
            )
            .await?;

        // A failed finalize leaves the order unfulfilled; verifying again
        // retries it.
        self.fulfillment.finalize(&order).await?;

        tracing::info!("Payment verified for order #{}", order.id);

        self.owned_order(order.id, user_id).await
    }

    pub async fn transaction(&self, order_id: Uuid, user_id: Uuid) -> Result<Transaction, AppError> {
        self.transactions
            .find_by_order(order_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))
    }

    pub async fn list_methods(&self, user_id: Uuid) -> Result<Vec<SavedPaymentMethod>, AppError> {
        Ok(self.methods.list(user_id).await?)
    }

    pub async fn save_method(
        &self,
        user_id: Uuid,
        req: SavePaymentMethod,
    ) -> Result<SavedPaymentMethod, AppError> {
        let method_type: PaymentMethodType = req.method_type.parse().map_err(|_| {
            AppError::InvalidInput(format!(
                "{} is not a valid payment method type",
                req.method_type
            ))
        })?;

        if let Some(last4) = &req.card_last4 {
            if last4.len() != 4 || !last4.chars().all(|c| c.is_ascii_digit()) {
                return Err(AppError::InvalidInput(
                    "card_last4 must be exactly four digits".to_string(),
                ));
            }
        }

        if req.is_default {
            self.methods.clear_default(user_id).await?;
        }

        let method = SavedPaymentMethod {
            id: Uuid::new_v4(),
            user_id,
            method_type,
            card_last4: req.card_last4,
            card_network: req.card_network,
            upi_id: req.upi_id,
            is_default: req.is_default,
            created_at: Utc::now(),
        };
        self.methods.insert(&method).await?;

        Ok(method)
    }

    pub async fn delete_method(&self, id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        if !self.methods.delete(id, user_id).await? {
            return Err(method_not_found());
        }
        Ok(())
    }

    /// Last write wins: the user's other methods lose the default flag.
    pub async fn set_default_method(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<SavedPaymentMethod, AppError> {
        let mut method = self
            .methods
            .list(user_id)
            .await?
            .into_iter()
            .find(|method| method.id == id)
            .ok_or_else(method_not_found)?;

        self.methods.clear_default(user_id).await?;
        if !self.methods.mark_default(id, user_id).await? {
            return Err(method_not_found());
        }

        method.is_default = true;
        Ok(method)
    }

    async fn owned_order(&self, order_id: Uuid, user_id: Uuid) -> Result<Order, AppError> {
        self.orders
            .find_for_user(order_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
    }
}

fn not_configured() -> AppError {
    AppError::Unavailable("Payment service not configured".to_string())
}

fn method_not_found() -> AppError {
    AppError::NotFound("Payment method not found".to_string())
}
