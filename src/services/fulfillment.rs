use std::sync::Arc;

use chrono::Utc;

use crate::{app_error::AppError, domain::Order, repositories::OrderRepository};

/// Consumes the buyer's cart and takes the ordered quantities out of stock,
/// at most once per order.
///
/// The storage applies both steps together with the `fulfilled_at` stamp, so a
/// failed attempt leaves nothing behind and can be retried.
#[derive(Clone)]
pub struct FulfillmentService {
    orders: Arc<dyn OrderRepository>,
}

impl FulfillmentService {
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self { orders }
    }

    /// Persists a new order already finalized. Nothing is persisted on error.
    pub async fn place(&self, order: &mut Order) -> Result<(), AppError> {
        let at = Utc::now();
        self.orders.insert_fulfilled(order, at).await?;
        order.fulfilled_at = Some(at);

        tracing::info!("Order #{} finalized", order.id);
        Ok(())
    }

    /// Returns `false` when the order had already been finalized.
    ///
    /// Stock is decremented without a floor: it trusts the checks made when
    /// the items entered the cart and may go negative under contention.
    pub async fn finalize(&self, order: &Order) -> Result<bool, AppError> {
        if !self.orders.fulfill(order, Utc::now()).await? {
            tracing::debug!("Order #{} already finalized", order.id);
            return Ok(false);
        }

        tracing::info!("Order #{} finalized", order.id);
        Ok(true)
    }
}
