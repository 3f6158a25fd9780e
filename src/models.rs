use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use diesel::{
    Selectable,
    prelude::{AsChangeset, Identifiable, Insertable, Queryable},
};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{
    Cart, CartItem, Medicine, Order, PaymentUpdate, Pharmacy, SavedPaymentMethod, Transaction,
    TransactionUpdate,
};

// Catalog

#[derive(Queryable, Selectable, Identifiable, Debug)]
#[diesel(table_name = crate::schema::pharmacies)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PharmacyEntity {
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

impl From<PharmacyEntity> for Pharmacy {
    fn from(entity: PharmacyEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            description: entity.description,
            address: entity.address,
            phone: entity.phone,
            rating: entity.rating,
            image: entity.image,
            is_open: entity.is_open,
            delivery_time: entity.delivery_time,
            minimum_order: entity.minimum_order,
            latitude: entity.latitude,
            longitude: entity.longitude,
            created_at: entity.created_at,
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug)]
#[diesel(table_name = crate::schema::medicines)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MedicineEntity {
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
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl From<MedicineEntity> for Medicine {
    fn from(entity: MedicineEntity) -> Self {
        Self {
            id: entity.id,
            pharmacy_id: entity.pharmacy_id,
            name: entity.name,
            description: entity.description,
            price: entity.price,
            mrp: entity.mrp,
            discount_percentage: entity.discount_percentage,
            stock_quantity: entity.stock_quantity,
            category: entity.category,
            image: entity.image,
            prescription_required: entity.prescription_required,
            version: entity.version,
            created_at: entity.created_at,
        }
    }
}

// Carts

#[derive(Queryable, Selectable, Identifiable, Debug)]
#[diesel(table_name = crate::schema::carts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub pharmacy_id: Uuid,
    pub items: Value,
    pub total_amount: f64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::carts)]
pub struct CreateCartEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub pharmacy_id: Uuid,
    pub items: Value,
    pub total_amount: f64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CartEntity> for Cart {
    type Error = anyhow::Error;

    fn try_from(entity: CartEntity) -> Result<Self> {
        Ok(Self {
            id: entity.id,
            user_id: entity.user_id,
            pharmacy_id: entity.pharmacy_id,
            items: items_from_value(entity.items)?,
            total_amount: entity.total_amount,
            version: entity.version,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        })
    }
}

impl TryFrom<&Cart> for CreateCartEntity {
    type Error = anyhow::Error;

    fn try_from(cart: &Cart) -> Result<Self> {
        Ok(Self {
            id: cart.id,
            user_id: cart.user_id,
            pharmacy_id: cart.pharmacy_id,
            items: items_to_value(&cart.items)?,
            total_amount: cart.total_amount,
            version: cart.version,
            created_at: cart.created_at,
            updated_at: cart.updated_at,
        })
    }
}

// Orders

#[derive(Queryable, Selectable, Identifiable, Debug)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub pharmacy_id: Uuid,
    pub items: Value,
    pub total_amount: f64,
    pub delivery_address: String,
    pub phone: String,
    pub status: String,
    pub payment_method: String,
    pub payment_status: String,
    pub provider_order_id: Option<String>,
    pub provider_payment_id: Option<String>,
    pub provider_signature: Option<String>,
    pub fulfilled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::orders)]
pub struct CreateOrderEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub pharmacy_id: Uuid,
    pub items: Value,
    pub total_amount: f64,
    pub delivery_address: String,
    pub phone: String,
    pub status: String,
    pub payment_method: String,
    pub payment_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<OrderEntity> for Order {
    type Error = anyhow::Error;

    fn try_from(entity: OrderEntity) -> Result<Self> {
        Ok(Self {
            id: entity.id,
            user_id: entity.user_id,
            pharmacy_id: entity.pharmacy_id,
            items: items_from_value(entity.items)?,
            total_amount: entity.total_amount,
            delivery_address: entity.delivery_address,
            phone: entity.phone,
            status: entity
                .status
                .parse()
                .with_context(|| format!("Unknown order status {}", entity.status))?,
            payment_method: entity
                .payment_method
                .parse()
                .with_context(|| format!("Unknown payment method {}", entity.payment_method))?,
            payment_status: entity
                .payment_status
                .parse()
                .with_context(|| format!("Unknown payment status {}", entity.payment_status))?,
            provider_order_id: entity.provider_order_id,
            provider_payment_id: entity.provider_payment_id,
            provider_signature: entity.provider_signature,
            fulfilled_at: entity.fulfilled_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        })
    }
}

impl TryFrom<&Order> for CreateOrderEntity {
    type Error = anyhow::Error;

    fn try_from(order: &Order) -> Result<Self> {
        Ok(Self {
            id: order.id,
            user_id: order.user_id,
            pharmacy_id: order.pharmacy_id,
            items: items_to_value(&order.items)?,
            total_amount: order.total_amount,
            delivery_address: order.delivery_address.clone(),
            phone: order.phone.clone(),
            status: order.status.to_string(),
            payment_method: order.payment_method.to_string(),
            payment_status: order.payment_status.to_string(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        })
    }
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = crate::schema::orders)]
pub struct OrderPaymentChangeset {
    pub payment_status: String,
    pub provider_payment_id: Option<String>,
    pub provider_signature: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<PaymentUpdate> for OrderPaymentChangeset {
    fn from(update: PaymentUpdate) -> Self {
        Self {
            payment_status: update.status.to_string(),
            provider_payment_id: update.provider_payment_id,
            provider_signature: update.provider_signature,
            updated_at: Utc::now(),
        }
    }
}

// Payments

#[derive(Queryable, Selectable, Identifiable, Debug)]
#[diesel(table_name = crate::schema::transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TransactionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_id: Uuid,
    pub amount: f64,
    pub payment_method: String,
    pub status: String,
    pub provider_order_id: Option<String>,
    pub provider_payment_id: Option<String>,
    pub provider_signature: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::transactions)]
pub struct CreateTransactionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_id: Uuid,
    pub amount: f64,
    pub payment_method: String,
    pub status: String,
    pub provider_order_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionEntity> for Transaction {
    type Error = anyhow::Error;

    fn try_from(entity: TransactionEntity) -> Result<Self> {
        Ok(Self {
            id: entity.id,
            user_id: entity.user_id,
            order_id: entity.order_id,
            amount: entity.amount,
            payment_method: entity.payment_method,
            status: entity
                .status
                .parse()
                .with_context(|| format!("Unknown transaction status {}", entity.status))?,
            provider_order_id: entity.provider_order_id,
            provider_payment_id: entity.provider_payment_id,
            provider_signature: entity.provider_signature,
            error_message: entity.error_message,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        })
    }
}

impl From<&Transaction> for CreateTransactionEntity {
    fn from(transaction: &Transaction) -> Self {
        Self {
            id: transaction.id,
            user_id: transaction.user_id,
            order_id: transaction.order_id,
            amount: transaction.amount,
            payment_method: transaction.payment_method.clone(),
            status: transaction.status.to_string(),
            provider_order_id: transaction.provider_order_id.clone(),
            created_at: transaction.created_at,
            updated_at: transaction.updated_at,
        }
    }
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = crate::schema::transactions)]
pub struct TransactionChangeset {
    pub status: String,
    pub provider_payment_id: Option<String>,
    pub provider_signature: Option<String>,
    /// Always written; `Some(None)` clears the column.
    pub error_message: Option<Option<String>>,
    pub updated_at: DateTime<Utc>,
}

impl From<TransactionUpdate> for TransactionChangeset {
    fn from(update: TransactionUpdate) -> Self {
        Self {
            status: update.status.to_string(),
            provider_payment_id: update.provider_payment_id,
            provider_signature: update.provider_signature,
            error_message: Some(update.error_message),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug)]
#[diesel(table_name = crate::schema::payment_methods)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentMethodEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub method_type: String,
    pub card_last4: Option<String>,
    pub card_network: Option<String>,
    pub upi_id: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::payment_methods)]
pub struct CreatePaymentMethodEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub method_type: String,
    pub card_last4: Option<String>,
    pub card_network: Option<String>,
    pub upi_id: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PaymentMethodEntity> for SavedPaymentMethod {
    type Error = anyhow::Error;

    fn try_from(entity: PaymentMethodEntity) -> Result<Self> {
        Ok(Self {
            id: entity.id,
            user_id: entity.user_id,
            method_type: entity
                .method_type
                .parse()
                .with_context(|| format!("Unknown payment method type {}", entity.method_type))?,
            card_last4: entity.card_last4,
            card_network: entity.card_network,
            upi_id: entity.upi_id,
            is_default: entity.is_default,
            created_at: entity.created_at,
        })
    }
}

impl From<&SavedPaymentMethod> for CreatePaymentMethodEntity {
    fn from(method: &SavedPaymentMethod) -> Self {
        Self {
            id: method.id,
            user_id: method.user_id,
            method_type: method.method_type.to_string(),
            card_last4: method.card_last4.clone(),
            card_network: method.card_network.clone(),
            upi_id: method.upi_id.clone(),
            is_default: method.is_default,
            created_at: method.created_at,
        }
    }
}

// Line items are stored as jsonb documents.

pub fn items_to_value(items: &[CartItem]) -> Result<Value> {
    serde_json::to_value(items).context("Failed to serialize line items")
}

pub fn items_from_value(value: Value) -> Result<Vec<CartItem>> {
    serde_json::from_value(value).context("Failed to deserialize line items")
}
