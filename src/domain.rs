//! Domain types shared by the services, repositories and HTTP layer.
//!
//! Money is carried as `f64` to match the catalog's price precision; cart and
//! order totals are always the plain sum of `price * quantity` over their line
//! items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

// Catalog

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Pharmacy {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub address: String,
    pub phone: String,
    pub rating: f64,
    pub image: String,
    pub is_open: bool,
    pub delivery_time: String,
    pub minimum_order: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Medicine {
    pub id: Uuid,
    pub pharmacy_id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub mrp: f64,
    pub discount_percentage: f64,
    pub stock_quantity: i32,
    pub category: String,
    pub image: String,
    pub prescription_required: bool,
    /// Bumped on every stock write.
    #[serde(skip)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

// Carts

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub medicine_id: Uuid,
    pub quantity: i32,
    /// Unit price captured when the medicine was first added.
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub pharmacy_id: Uuid,
    pub items: Vec<CartItem>,
    pub total_amount: f64,
    #[serde(skip)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(user_id: Uuid, pharmacy_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            pharmacy_id,
            items: Vec::new(),
            total_amount: 0.0,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn item_mut(&mut self, medicine_id: Uuid) -> Option<&mut CartItem> {
        self.items
            .iter_mut()
            .find(|item| item.medicine_id == medicine_id)
    }

    pub fn contains(&self, medicine_id: Uuid) -> bool {
        self.items.iter().any(|item| item.medicine_id == medicine_id)
    }

    pub fn remove_item(&mut self, medicine_id: Uuid) {
        self.items.retain(|item| item.medicine_id != medicine_id);
    }

    /// Must be called after every change to `items`.
    pub fn recompute_total(&mut self) {
        self.total_amount = items_total(&self.items);
        self.updated_at = Utc::now();
    }
}

pub fn items_total(items: &[CartItem]) -> f64 {
    items
        .iter()
        .map(|item| item.price * item.quantity as f64)
        .sum()
}

// Orders

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    Placed,
    Confirmed,
    Preparing,
    OutForDelivery,
    Delivered,
    Cancelled,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery.
    Cod,
    Online,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub pharmacy_id: Uuid,
    pub items: Vec<CartItem>,
    pub total_amount: f64,
    pub delivery_address: String,
    pub phone: String,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub provider_order_id: Option<String>,
    pub provider_payment_id: Option<String>,
    pub provider_signature: Option<String>,
    /// Set once the cart has been consumed and stock decremented.
    pub fulfilled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Snapshots the cart's items and total into a freshly placed order.
    pub fn from_cart(
        cart: &Cart,
        delivery_address: String,
        phone: String,
        payment_method: PaymentMethod,
    ) -> Self {
        let payment_status = match payment_method {
            PaymentMethod::Cod => PaymentStatus::Completed,
            PaymentMethod::Online => PaymentStatus::Pending,
        };
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            user_id: cart.user_id,
            pharmacy_id: cart.pharmacy_id,
            items: cart.items.clone(),
            total_amount: cart.total_amount,
            delivery_address,
            phone,
            status: OrderStatus::Placed,
            payment_method,
            payment_status,
            provider_order_id: None,
            provider_payment_id: None,
            provider_signature: None,
            fulfilled_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Payment outcome written onto an order after verification. `None` fields
/// keep their stored value.
#[derive(Debug, Clone)]
pub struct PaymentUpdate {
    pub status: PaymentStatus,
    pub provider_payment_id: Option<String>,
    pub provider_signature: Option<String>,
}

// Payments

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransactionStatus {
    Initiated,
    Success,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_id: Uuid,
    pub amount: f64,
    pub payment_method: String,
    pub status: TransactionStatus,
    pub provider_order_id: Option<String>,
    pub provider_payment_id: Option<String>,
    pub provider_signature: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `None` provider ids keep their stored value. `error_message` always
/// replaces the stored one, so `None` clears it.
#[derive(Debug, Clone)]
pub struct TransactionUpdate {
    pub status: TransactionStatus,
    pub provider_payment_id: Option<String>,
    pub provider_signature: Option<String>,
    pub error_message: Option<String>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethodType {
    Upi,
    Card,
    Netbanking,
    Wallet,
}

/// A payment instrument the user saved for later checkouts. Only masked
/// identifiers are ever stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SavedPaymentMethod {
    pub id: Uuid,
    pub user_id: Uuid,
    pub method_type: PaymentMethodType,
    pub card_last4: Option<String>,
    pub card_network: Option<String>,
    pub upi_id: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

// Events

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEventKind {
    Created,
    StatusUpdated,
}

impl OrderEventKind {
    pub fn event_name(self) -> &'static str {
        match self {
            OrderEventKind::Created => "order_created",
            OrderEventKind::StatusUpdated => "order_status_updated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderEvent {
    #[serde(skip)]
    pub kind: OrderEventKind,
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub user_id: Uuid,
}

impl OrderEvent {
    pub fn created(order: &Order) -> Self {
        Self {
            kind: OrderEventKind::Created,
            order_id: order.id,
            status: order.status,
            user_id: order.user_id,
        }
    }

    pub fn status_updated(order: &Order) -> Self {
        Self {
            kind: OrderEventKind::StatusUpdated,
            ..Self::created(order)
        }
    }
}
