use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{
    AsyncConnection, AsyncPgConnection, RunQueryDsl, pooled_connection::bb8::PooledConnection,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    domain::{
        Cart, Medicine, Order, OrderStatus, PaymentUpdate, Pharmacy, SavedPaymentMethod,
        Transaction, TransactionUpdate,
    },
    models::{
        CartEntity, CreateCartEntity, CreateOrderEntity, CreatePaymentMethodEntity,
        CreateTransactionEntity, MedicineEntity, OrderEntity, OrderPaymentChangeset,
        PaymentMethodEntity, PharmacyEntity, TransactionChangeset, TransactionEntity,
        items_to_value,
    },
    repositories::{
        CartRepository, CatalogRepository, OrderRepository, PaymentMethodRepository,
        TransactionRepository,
    },
    schema::{carts, medicines, orders, payment_methods, pharmacies, transactions},
};

/// Postgres-backed implementation of every repository port.
#[derive(Clone)]
pub struct PgRepository {
    pool: DbPool,
}

impl PgRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> Result<PooledConnection<'_, AsyncPgConnection>> {
        self.pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")
    }
}

#[async_trait]
impl CatalogRepository for PgRepository {
    async fn list_pharmacies(&self) -> Result<Vec<Pharmacy>> {
        let conn = &mut self.conn().await?;

        let pharmacies: Vec<PharmacyEntity> = pharmacies::table
            .select(PharmacyEntity::as_select())
            .order_by(pharmacies::name.asc())
            .get_results(conn)
            .await
            .context("Failed to get pharmacies")?;

        Ok(pharmacies.into_iter().map(Pharmacy::from).collect())
    }

    async fn find_pharmacy(&self, id: Uuid) -> Result<Option<Pharmacy>> {
        let conn = &mut self.conn().await?;

        let pharmacy: Option<PharmacyEntity> = pharmacies::table
            .find(id)
            .select(PharmacyEntity::as_select())
            .first(conn)
            .await
            .optional()
            .context("Failed to get pharmacy")?;

        Ok(pharmacy.map(Pharmacy::from))
    }

    async fn list_medicines(&self, pharmacy_id: Uuid) -> Result<Vec<Medicine>> {
        let conn = &mut self.conn().await?;

        let medicines: Vec<MedicineEntity> = medicines::table
            .filter(medicines::pharmacy_id.eq(pharmacy_id))
            .select(MedicineEntity::as_select())
            .order_by(medicines::name.asc())
            .get_results(conn)
            .await
            .context("Failed to get medicines")?;

        Ok(medicines.into_iter().map(Medicine::from).collect())
    }

    async fn find_medicine(&self, id: Uuid) -> Result<Option<Medicine>> {
        let conn = &mut self.conn().await?;

        let medicine: Option<MedicineEntity> = medicines::table
            .find(id)
            .select(MedicineEntity::as_select())
            .first(conn)
            .await
            .optional()
            .context("Failed to get medicine")?;

        Ok(medicine.map(Medicine::from))
    }

    async fn find_medicines_by_category(
        &self,
        category: &str,
        exclude: Uuid,
        limit: i64,
    ) -> Result<Vec<Medicine>> {
        let conn = &mut self.conn().await?;

        let medicines: Vec<MedicineEntity> = medicines::table
            .filter(medicines::category.eq(category))
            .filter(medicines::id.ne(exclude))
            .select(MedicineEntity::as_select())
            .limit(limit)
            .get_results(conn)
            .await
            .context("Failed to get alternative medicines")?;

        Ok(medicines.into_iter().map(Medicine::from).collect())
    }
}

#[async_trait]
impl CartRepository for PgRepository {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Cart>> {
        let conn = &mut self.conn().await?;

        let cart: Option<CartEntity> = carts::table
            .filter(carts::user_id.eq(user_id))
            .select(CartEntity::as_select())
            .first(conn)
            .await
            .optional()
            .context("Failed to get cart")?;

        cart.map(Cart::try_from).transpose()
    }

    async fn insert(&self, cart: &Cart) -> Result<bool> {
        let conn = &mut self.conn().await?;

        let inserted = diesel::insert_into(carts::table)
            .values(CreateCartEntity::try_from(cart)?)
            .on_conflict(carts::user_id)
            .do_nothing()
            .execute(conn)
            .await
            .context("Failed to create cart")?;

        Ok(inserted == 1)
    }

    async fn replace(&self, cart: &Cart) -> Result<bool> {
        let conn = &mut self.conn().await?;

        let updated = diesel::update(
            carts::table
                .filter(carts::user_id.eq(cart.user_id))
                .filter(carts::version.eq(cart.version)),
        )
        .set((
            carts::pharmacy_id.eq(cart.pharmacy_id),
            carts::items.eq(items_to_value(&cart.items)?),
            carts::total_amount.eq(cart.total_amount),
            carts::version.eq(cart.version + 1),
            carts::updated_at.eq(cart.updated_at),
        ))
        .execute(conn)
        .await
        .context("Failed to update cart")?;

        Ok(updated == 1)
    }

    async fn delete(&self, user_id: Uuid, expected_version: i64) -> Result<bool> {
        let conn = &mut self.conn().await?;

        let deleted = diesel::delete(
            carts::table
                .filter(carts::user_id.eq(user_id))
                .filter(carts::version.eq(expected_version)),
        )
        .execute(conn)
        .await
        .context("Failed to delete cart")?;

        Ok(deleted == 1)
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<()> {
        let conn = &mut self.conn().await?;

        diesel::delete(carts::table.filter(carts::user_id.eq(user_id)))
            .execute(conn)
            .await
            .context("Failed to delete cart")?;

        Ok(())
    }
}

#[async_trait]
impl OrderRepository for PgRepository {
    async fn insert(&self, order: &Order) -> Result<()> {
        let conn = &mut self.conn().await?;

        diesel::insert_into(orders::table)
            .values(CreateOrderEntity::try_from(order)?)
            .execute(conn)
            .await
            .context("Failed to create order")?;

        Ok(())
    }

    async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Order>> {
        let conn = &mut self.conn().await?;

        let order: Option<OrderEntity> = orders::table
            .find(id)
            .filter(orders::user_id.eq(user_id))
            .select(OrderEntity::as_select())
            .first(conn)
            .await
            .optional()
            .context("Failed to get order")?;

        order.map(Order::try_from).transpose()
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let conn = &mut self.conn().await?;

        let orders: Vec<OrderEntity> = orders::table
            .filter(orders::user_id.eq(user_id))
            .order_by(orders::created_at.desc())
            .select(OrderEntity::as_select())
            .get_results(conn)
            .await
            .context("Failed to get my orders")?;

        orders.into_iter().map(Order::try_from).collect()
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Order>> {
        let conn = &mut self.conn().await?;

        let order: Option<OrderEntity> = diesel::update(orders::table.find(id))
            .set((
                orders::status.eq(status.to_string()),
                orders::updated_at.eq(updated_at),
            ))
            .returning(OrderEntity::as_returning())
            .get_result(conn)
            .await
            .optional()
            .context("Failed to update order status")?;

        order.map(Order::try_from).transpose()
    }

    async fn set_provider_order(&self, id: Uuid, provider_order_id: &str) -> Result<()> {
        let conn = &mut self.conn().await?;

        diesel::update(orders::table.find(id))
            .set((
                orders::provider_order_id.eq(provider_order_id),
                orders::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .await
            .context("Failed to attach provider order")?;

        Ok(())
    }

    async fn record_payment(&self, id: Uuid, update: PaymentUpdate) -> Result<()> {
        let conn = &mut self.conn().await?;

        diesel::update(orders::table.find(id))
            .set(OrderPaymentChangeset::from(update))
            .execute(conn)
            .await
            .context("Failed to update order payment status")?;

        Ok(())
    }

    async fn fulfill(&self, order: &Order, at: DateTime<Utc>) -> Result<bool> {
        let conn = &mut self.conn().await?;

        conn.transaction(move |conn| Box::pin(async move { fulfill_in(conn, order, at).await }))
            .await
            .context("Transaction failed")
    }

    async fn insert_fulfilled(&self, order: &Order, at: DateTime<Utc>) -> Result<()> {
        let conn = &mut self.conn().await?;
        let entity = CreateOrderEntity::try_from(order)?;

        conn.transaction(move |conn| {
            Box::pin(async move {
                diesel::insert_into(orders::table)
                    .values(entity)
                    .execute(conn)
                    .await
                    .context("Failed to create order")?;

                fulfill_in(conn, order, at).await?;

                Ok::<(), anyhow::Error>(())
            })
        })
        .await
        .context("Transaction failed")
    }
}

/// Fulfillment steps, run inside the caller's transaction. Concurrent callers
/// serialize on the order row, so only one of them sees `fulfilled_at` null.
async fn fulfill_in(
    conn: &mut AsyncPgConnection,
    order: &Order,
    at: DateTime<Utc>,
) -> Result<bool> {
    let stamped = diesel::update(
        orders::table
            .find(order.id)
            .filter(orders::fulfilled_at.is_null()),
    )
    .set(orders::fulfilled_at.eq(at))
    .execute(conn)
    .await
    .context("Failed to mark order fulfilled")?;

    if stamped == 0 {
        return Ok(false);
    }

    diesel::delete(carts::table.filter(carts::user_id.eq(order.user_id)))
        .execute(conn)
        .await
        .context("Failed to delete cart")?;

    // No floor: stock may go negative under contention.
    for item in &order.items {
        let updated = diesel::update(medicines::table.find(item.medicine_id))
            .set((
                medicines::stock_quantity.eq(medicines::stock_quantity - item.quantity),
                medicines::version.eq(medicines::version + 1),
            ))
            .execute(conn)
            .await
            .context("Failed to decrement medicine stock")?;

        if updated == 0 {
            tracing::warn!(
                "Medicine {} left the catalog before its stock could be decremented",
                item.medicine_id
            );
        }
    }

    Ok(true)
}

#[async_trait]
impl TransactionRepository for PgRepository {
    async fn insert(&self, transaction: &Transaction) -> Result<()> {
        let conn = &mut self.conn().await?;

        diesel::insert_into(transactions::table)
            .values(CreateTransactionEntity::from(transaction))
            .execute(conn)
            .await
            .context("Failed to create transaction")?;

        Ok(())
    }

    async fn find_by_order(&self, order_id: Uuid, user_id: Uuid) -> Result<Option<Transaction>> {
        let conn = &mut self.conn().await?;

        let transaction: Option<TransactionEntity> = transactions::table
            .filter(transactions::order_id.eq(order_id))
            .filter(transactions::user_id.eq(user_id))
            .order_by(transactions::created_at.desc())
            .select(TransactionEntity::as_select())
            .first(conn)
            .await
            .optional()
            .context("Failed to get transaction")?;

        transaction.map(Transaction::try_from).transpose()
    }

    async fn update_by_provider_order(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        provider_order_id: &str,
        update: TransactionUpdate,
    ) -> Result<bool> {
        let conn = &mut self.conn().await?;

        let updated = diesel::update(
            transactions::table
                .filter(transactions::order_id.eq(order_id))
                .filter(transactions::user_id.eq(user_id))
                .filter(transactions::provider_order_id.eq(provider_order_id)),
        )
        .set(TransactionChangeset::from(update))
        .execute(conn)
        .await
        .context("Failed to update transaction")?;

        Ok(updated > 0)
    }
}

#[async_trait]
impl PaymentMethodRepository for PgRepository {
    async fn list(&self, user_id: Uuid) -> Result<Vec<SavedPaymentMethod>> {
        let conn = &mut self.conn().await?;

        let methods: Vec<PaymentMethodEntity> = payment_methods::table
            .filter(payment_methods::user_id.eq(user_id))
            .order_by(payment_methods::created_at.asc())
            .select(PaymentMethodEntity::as_select())
            .get_results(conn)
            .await
            .context("Failed to get payment methods")?;

        methods
            .into_iter()
            .map(SavedPaymentMethod::try_from)
            .collect()
    }

    async fn insert(&self, method: &SavedPaymentMethod) -> Result<()> {
        let conn = &mut self.conn().await?;

        diesel::insert_into(payment_methods::table)
            .values(CreatePaymentMethodEntity::from(method))
            .execute(conn)
            .await
            .context("Failed to save payment method")?;

        Ok(())
    }

    async fn clear_default(&self, user_id: Uuid) -> Result<()> {
        let conn = &mut self.conn().await?;

        diesel::update(payment_methods::table.filter(payment_methods::user_id.eq(user_id)))
            .set(payment_methods::is_default.eq(false))
            .execute(conn)
            .await
            .context("Failed to clear default payment method")?;

        Ok(())
    }

    async fn mark_default(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let conn = &mut self.conn().await?;

        let updated = diesel::update(
            payment_methods::table
                .find(id)
                .filter(payment_methods::user_id.eq(user_id)),
        )
        .set(payment_methods::is_default.eq(true))
        .execute(conn)
        .await
        .context("Failed to set default payment method")?;

        Ok(updated == 1)
    }

    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let conn = &mut self.conn().await?;

        let deleted = diesel::delete(
            payment_methods::table
                .find(id)
                .filter(payment_methods::user_id.eq(user_id)),
        )
        .execute(conn)
        .await
        .context("Failed to delete payment method")?;

        Ok(deleted == 1)
    }
}
