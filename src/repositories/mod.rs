//! Storage ports used by the services.
//!
//! Each entity gets its own trait so services only see the operations they
//! need. [`postgres::PgRepository`] backs the running service and
//! [`memory::InMemoryStore`] backs tests. Both implement every trait.
//!
//! Cart writes that follow a read of the same cart are compare-and-swap
//! operations keyed on a `version` field: they report `false` instead of
//! overwriting a cart that changed since it was read. Order fulfillment is a
//! single storage transaction instead.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Cart, Medicine, Order, OrderStatus, PaymentUpdate, Pharmacy, SavedPaymentMethod, Transaction,
    TransactionUpdate,
};

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn list_pharmacies(&self) -> Result<Vec<Pharmacy>>;

    async fn find_pharmacy(&self, id: Uuid) -> Result<Option<Pharmacy>>;

    async fn list_medicines(&self, pharmacy_id: Uuid) -> Result<Vec<Medicine>>;

    async fn find_medicine(&self, id: Uuid) -> Result<Option<Medicine>>;

    /// Medicines sharing `category`, excluding `exclude`, at most `limit`.
    async fn find_medicines_by_category(
        &self,
        category: &str,
        exclude: Uuid,
        limit: i64,
    ) -> Result<Vec<Medicine>>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Cart>>;

    /// Returns `false` when the user already owns a cart.
    async fn insert(&self, cart: &Cart) -> Result<bool>;

    /// Overwrites the stored cart if its version still equals `cart.version`.
    /// The stored version becomes `cart.version + 1`.
    async fn replace(&self, cart: &Cart) -> Result<bool>;

    /// Deletes the user's cart if its version still equals `expected_version`.
    async fn delete(&self, user_id: Uuid, expected_version: i64) -> Result<bool>;

    async fn delete_by_user(&self, user_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert(&self, order: &Order) -> Result<()>;

    async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Order>>;

    /// Newest first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>>;

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Order>>;

    async fn set_provider_order(&self, id: Uuid, provider_order_id: &str) -> Result<()>;

    async fn record_payment(&self, id: Uuid, update: PaymentUpdate) -> Result<()>;

    /// Stamps `fulfilled_at`, deletes the buyer's cart and takes every line
    /// item's quantity out of stock, all in one storage transaction.
    ///
    /// Returns `false` without writing anything when the order is unknown or
    /// already fulfilled. On error nothing is written.
    async fn fulfill(&self, order: &Order, at: DateTime<Utc>) -> Result<bool>;

    /// Inserts `order` and fulfills it in the same storage transaction.
    async fn insert_fulfilled(&self, order: &Order, at: DateTime<Utc>) -> Result<()>;
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn insert(&self, transaction: &Transaction) -> Result<()>;

    /// Latest transaction recorded for the order.
    async fn find_by_order(&self, order_id: Uuid, user_id: Uuid) -> Result<Option<Transaction>>;

    /// Updates the transactions opened for `provider_order_id` on the given
    /// order of the given user.
    async fn update_by_provider_order(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        provider_order_id: &str,
        update: TransactionUpdate,
    ) -> Result<bool>;
}

#[async_trait]
pub trait PaymentMethodRepository: Send + Sync {
    async fn list(&self, user_id: Uuid) -> Result<Vec<SavedPaymentMethod>>;

    async fn insert(&self, method: &SavedPaymentMethod) -> Result<()>;

    async fn clear_default(&self, user_id: Uuid) -> Result<()>;

    async fn mark_default(&self, id: Uuid, user_id: Uuid) -> Result<bool>;

    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<bool>;
}

/// Every repository the services depend on, ready to be injected.
#[derive(Clone)]
pub struct Repositories {
    pub catalog: Arc<dyn CatalogRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub transactions: Arc<dyn TransactionRepository>,
    pub payment_methods: Arc<dyn PaymentMethodRepository>,
}

impl Repositories {
    /// Uses a single store for every entity.
    pub fn from_store<S>(store: S) -> Self
    where
        S: CatalogRepository
            + CartRepository
            + OrderRepository
            + TransactionRepository
            + PaymentMethodRepository
            + 'static,
    {
        Self::from_shared(Arc::new(store))
    }

    /// Like [`Repositories::from_store`], keeping a handle on the store.
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: CatalogRepository
            + CartRepository
            + OrderRepository
            + TransactionRepository
            + PaymentMethodRepository
            + 'static,
    {
        Self {
            catalog: store.clone(),
            carts: store.clone(),
            orders: store.clone(),
            transactions: store.clone(),
            payment_methods: store,
        }
    }
}
