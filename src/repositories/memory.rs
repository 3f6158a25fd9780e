//! In-process store implementing every repository port, for tests and local
//! runs without Postgres. Same semantics as the Postgres store, including
//! version checks.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    domain::{
        Cart, Medicine, Order, OrderStatus, PaymentUpdate, Pharmacy, SavedPaymentMethod,
        Transaction, TransactionUpdate,
    },
    repositories::{
        CartRepository, CatalogRepository, OrderRepository, PaymentMethodRepository,
        TransactionRepository,
    },
};

#[derive(Default)]
struct Tables {
    pharmacies: HashMap<Uuid, Pharmacy>,
    medicines: HashMap<Uuid, Medicine>,
    /// Keyed by owning user.
    carts: HashMap<Uuid, Cart>,
    orders: Vec<Order>,
    transactions: Vec<Transaction>,
    payment_methods: Vec<SavedPaymentMethod>,
}

impl Tables {
    /// Everything happens under the caller's write lock, so readers never see
    /// a half-fulfilled order.
    fn fulfill(&mut self, order: &Order, at: DateTime<Utc>) -> bool {
        match self.orders.iter_mut().find(|stored| stored.id == order.id) {
            Some(stored) if stored.fulfilled_at.is_none() => stored.fulfilled_at = Some(at),
            _ => return false,
        }

        self.carts.remove(&order.user_id);

        for item in &order.items {
            match self.medicines.get_mut(&item.medicine_id) {
                Some(medicine) => {
                    medicine.stock_quantity -= item.quantity;
                    medicine.version += 1;
                }
                None => tracing::warn!(
                    "Medicine {} left the catalog before its stock could be decremented",
                    item.medicine_id
                ),
            }
        }

        true
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_pharmacy(&self, pharmacy: Pharmacy) {
        self.tables
            .write()
            .await
            .pharmacies
            .insert(pharmacy.id, pharmacy);
    }

    pub async fn put_medicine(&self, medicine: Medicine) {
        self.tables
            .write()
            .await
            .medicines
            .insert(medicine.id, medicine);
    }

    pub async fn remove_medicine(&self, id: Uuid) {
        self.tables.write().await.medicines.remove(&id);
    }

    pub async fn medicine(&self, id: Uuid) -> Option<Medicine> {
        self.tables.read().await.medicines.get(&id).cloned()
    }

    pub async fn cart(&self, user_id: Uuid) -> Option<Cart> {
        self.tables.read().await.carts.get(&user_id).cloned()
    }

    /// Stores a cart as-is, bypassing version checks.
    pub async fn put_cart(&self, cart: Cart) {
        self.tables.write().await.carts.insert(cart.user_id, cart);
    }

    pub async fn order(&self, id: Uuid) -> Option<Order> {
        self.tables
            .read()
            .await
            .orders
            .iter()
            .find(|order| order.id == id)
            .cloned()
    }

    pub async fn transactions(&self) -> Vec<Transaction> {
        self.tables.read().await.transactions.clone()
    }
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    async fn list_pharmacies(&self) -> Result<Vec<Pharmacy>> {
        let mut pharmacies: Vec<Pharmacy> =
            self.tables.read().await.pharmacies.values().cloned().collect();
        pharmacies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(pharmacies)
    }

    async fn find_pharmacy(&self, id: Uuid) -> Result<Option<Pharmacy>> {
        Ok(self.tables.read().await.pharmacies.get(&id).cloned())
    }

    async fn list_medicines(&self, pharmacy_id: Uuid) -> Result<Vec<Medicine>> {
        let mut medicines: Vec<Medicine> = self
            .tables
            .read()
            .await
            .medicines
            .values()
            .filter(|medicine| medicine.pharmacy_id == pharmacy_id)
            .cloned()
            .collect();
        medicines.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(medicines)
    }

    async fn find_medicine(&self, id: Uuid) -> Result<Option<Medicine>> {
        Ok(self.medicine(id).await)
    }

    async fn find_medicines_by_category(
        &self,
        category: &str,
        exclude: Uuid,
        limit: i64,
    ) -> Result<Vec<Medicine>> {
        let tables = self.tables.read().await;
        Ok(tables
            .medicines
            .values()
            .filter(|medicine| medicine.category == category && medicine.id != exclude)
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CartRepository for InMemoryStore {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Cart>> {
        Ok(self.cart(user_id).await)
    }

    async fn insert(&self, cart: &Cart) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.carts.contains_key(&cart.user_id) {
            return Ok(false);
        }
        tables.carts.insert(cart.user_id, cart.clone());
        Ok(true)
    }

    async fn replace(&self, cart: &Cart) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.carts.get_mut(&cart.user_id) {
            Some(stored) if stored.version == cart.version => {
                *stored = Cart {
                    version: cart.version + 1,
                    ..cart.clone()
                };
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, user_id: Uuid, expected_version: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.carts.get(&user_id) {
            Some(stored) if stored.version == expected_version => {
                tables.carts.remove(&user_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<()> {
        self.tables.write().await.carts.remove(&user_id);
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        self.tables.write().await.orders.push(order.clone());
        Ok(())
    }

    async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Order>> {
        Ok(self.order(id).await.filter(|order| order.user_id == user_id))
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .tables
            .read()
            .await
            .orders
            .iter()
            .rev()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        // Stable sort: equal timestamps keep the latest insert first.
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Order>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .orders
            .iter_mut()
            .find(|order| order.id == id)
            .map(|order| {
                order.status = status;
                order.updated_at = updated_at;
                order.clone()
            }))
    }

    async fn set_provider_order(&self, id: Uuid, provider_order_id: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(order) = tables.orders.iter_mut().find(|order| order.id == id) {
            order.provider_order_id = Some(provider_order_id.to_string());
            order.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn record_payment(&self, id: Uuid, update: PaymentUpdate) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(order) = tables.orders.iter_mut().find(|order| order.id == id) {
            order.payment_status = update.status;
            if update.provider_payment_id.is_some() {
                order.provider_payment_id = update.provider_payment_id;
            }
            if update.provider_signature.is_some() {
                order.provider_signature = update.provider_signature;
            }
            order.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn fulfill(&self, order: &Order, at: DateTime<Utc>) -> Result<bool> {
        Ok(self.tables.write().await.fulfill(order, at))
    }

    async fn insert_fulfilled(&self, order: &Order, at: DateTime<Utc>) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.orders.push(order.clone());
        tables.fulfill(order, at);
        Ok(())
    }
}

#[async_trait]
impl TransactionRepository for InMemoryStore {
    async fn insert(&self, transaction: &Transaction) -> Result<()> {
        self.tables
            .write()
            .await
            .transactions
            .push(transaction.clone());
        Ok(())
    }

    async fn find_by_order(&self, order_id: Uuid, user_id: Uuid) -> Result<Option<Transaction>> {
        Ok(self
            .tables
            .read()
            .await
            .transactions
            .iter()
            .filter(|tx| tx.order_id == order_id && tx.user_id == user_id)
            .max_by_key(|tx| tx.created_at)
            .cloned())
    }

    async fn update_by_provider_order(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        provider_order_id: &str,
        update: TransactionUpdate,
    ) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let mut updated = false;
        for tx in tables.transactions.iter_mut().filter(|tx| {
            tx.order_id == order_id
                && tx.user_id == user_id
                && tx.provider_order_id.as_deref() == Some(provider_order_id)
        }) {
            tx.status = update.status;
            if let Some(payment_id) = &update.provider_payment_id {
                tx.provider_payment_id = Some(payment_id.clone());
            }
            if let Some(signature) = &update.provider_signature {
                tx.provider_signature = Some(signature.clone());
            }
            tx.error_message = update.error_message.clone();
            tx.updated_at = Utc::now();
            updated = true;
        }
        Ok(updated)
    }
}

#[async_trait]
impl PaymentMethodRepository for InMemoryStore {
    async fn list(&self, user_id: Uuid) -> Result<Vec<SavedPaymentMethod>> {
        Ok(self
            .tables
            .read()
            .await
            .payment_methods
            .iter()
            .filter(|method| method.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, method: &SavedPaymentMethod) -> Result<()> {
        self.tables
            .write()
            .await
            .payment_methods
            .push(method.clone());
        Ok(())
    }

    async fn clear_default(&self, user_id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        for method in tables
            .payment_methods
            .iter_mut()
            .filter(|method| method.user_id == user_id)
        {
            method.is_default = false;
        }
        Ok(())
    }

    async fn mark_default(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables
            .payment_methods
            .iter_mut()
            .find(|method| method.id == id && method.user_id == user_id)
        {
            Some(method) => {
                method.is_default = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.payment_methods.len();
        tables
            .payment_methods
            .retain(|method| !(method.id == id && method.user_id == user_id));
        Ok(tables.payment_methods.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stale_cart_write_is_rejected() {
        let store = InMemoryStore::new();
        let cart = Cart::new(Uuid::new_v4(), Uuid::new_v4());
        assert!(CartRepository::insert(&store, &cart).await.unwrap());
        assert!(!CartRepository::insert(&store, &cart).await.unwrap());

        // First writer wins and bumps the version.
        assert!(store.replace(&cart).await.unwrap());
        assert!(!store.replace(&cart).await.unwrap());
        assert!(!CartRepository::delete(&store, cart.user_id, 0).await.unwrap());

        let stored = store.cart(cart.user_id).await.unwrap();
        assert_eq!(stored.version, 1);
        assert!(CartRepository::delete(&store, cart.user_id, 1).await.unwrap());
        assert!(store.cart(cart.user_id).await.is_none());
    }

    fn medicine(pharmacy_id: Uuid, stock_quantity: i32) -> Medicine {
        Medicine {
            id: Uuid::new_v4(),
            pharmacy_id,
            name: "Cetirizine 10mg".into(),
            description: String::new(),
            price: 20.0,
            mrp: 20.0,
            discount_percentage: 0.0,
            stock_quantity,
            category: "allergy".into(),
            image: String::new(),
            prescription_required: false,
            version: 0,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn fulfillment_applies_once() {
        let store = InMemoryStore::new();
        let pharmacy_id = Uuid::new_v4();
        let stocked = medicine(pharmacy_id, 10);
        store.put_medicine(stocked.clone()).await;

        let mut cart = Cart::new(Uuid::new_v4(), pharmacy_id);
        cart.items.push(crate::domain::CartItem {
            medicine_id: stocked.id,
            quantity: 3,
            price: stocked.price,
        });
        // Delisted medicines are skipped.
        cart.items.push(crate::domain::CartItem {
            medicine_id: Uuid::new_v4(),
            quantity: 1,
            price: 5.0,
        });
        cart.recompute_total();
        store.put_cart(cart.clone()).await;

        let order = Order::from_cart(
            &cart,
            "addr".into(),
            "123".into(),
            crate::domain::PaymentMethod::Online,
        );
        OrderRepository::insert(&store, &order).await.unwrap();

        assert!(store.fulfill(&order, Utc::now()).await.unwrap());
        assert!(!store.fulfill(&order, Utc::now()).await.unwrap());

        let after = store.medicine(stocked.id).await.unwrap();
        assert_eq!(after.stock_quantity, 7);
        assert_eq!(after.version, 1);
        assert!(store.cart(cart.user_id).await.is_none());
        assert!(store.order(order.id).await.unwrap().fulfilled_at.is_some());
    }

    #[tokio::test]
    async fn unknown_order_is_not_fulfilled() {
        let store = InMemoryStore::new();
        let cart = Cart::new(Uuid::new_v4(), Uuid::new_v4());
        store.put_cart(cart.clone()).await;
        let order = Order::from_cart(
            &cart,
            "addr".into(),
            "123".into(),
            crate::domain::PaymentMethod::Cod,
        );

        assert!(!store.fulfill(&order, Utc::now()).await.unwrap());
        assert!(store.cart(cart.user_id).await.is_some());
    }

    #[tokio::test]
    async fn transaction_updates_stay_within_the_order() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let transaction = |user_id: Uuid| Transaction {
            id: Uuid::new_v4(),
            user_id,
            order_id: Uuid::new_v4(),
            amount: 100.0,
            payment_method: "razorpay".into(),
            status: crate::domain::TransactionStatus::Initiated,
            provider_order_id: Some("o1".into()),
            provider_payment_id: None,
            provider_signature: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        let mine = transaction(Uuid::new_v4());
        let theirs = transaction(Uuid::new_v4());
        TransactionRepository::insert(&store, &mine).await.unwrap();
        TransactionRepository::insert(&store, &theirs).await.unwrap();

        let failed = TransactionUpdate {
            status: crate::domain::TransactionStatus::Failed,
            provider_payment_id: None,
            provider_signature: None,
            error_message: Some("Signature verification failed".into()),
        };
        assert!(
            store
                .update_by_provider_order(mine.order_id, mine.user_id, "o1", failed.clone())
                .await
                .unwrap()
        );
        assert!(
            !store
                .update_by_provider_order(theirs.order_id, mine.user_id, "o1", failed)
                .await
                .unwrap()
        );

        let transactions = store.transactions().await;
        let stored = |id: Uuid| transactions.iter().find(|tx| tx.id == id).unwrap();
        assert_eq!(stored(mine.id).status, crate::domain::TransactionStatus::Failed);
        assert_eq!(
            stored(theirs.id).status,
            crate::domain::TransactionStatus::Initiated
        );
    }
}
