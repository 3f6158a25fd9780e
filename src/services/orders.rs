use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    app_error::AppError,
    domain::{Order, OrderEvent, OrderStatus, PaymentMethod},
    repositories::{CartRepository, CatalogRepository, OrderRepository},
    services::{
        fulfillment::FulfillmentService,
        notifications::{self, NotificationEmitter},
    },
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrder {
    pub delivery_address: String,
    pub phone: String,
    /// `cod` or `online`.
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
}

fn default_payment_method() -> String {
    PaymentMethod::Cod.to_string()
}

#[derive(Clone)]
pub struct OrderService {
    catalog: Arc<dyn CatalogRepository>,
    carts: Arc<dyn CartRepository>,
    orders: Arc<dyn OrderRepository>,
    fulfillment: FulfillmentService,
    notifier: Arc<dyn NotificationEmitter>,
}

impl OrderService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        carts: Arc<dyn CartRepository>,
        orders: Arc<dyn OrderRepository>,
        fulfillment: FulfillmentService,
        notifier: Arc<dyn NotificationEmitter>,
    ) -> Self {
        Self {
            catalog,
            carts,
            orders,
            fulfillment,
            notifier,
        }
    }

    /// Places an order from the user's cart.
    ///
    /// Cash-on-delivery orders are inserted and finalized together, so a
    /// failure leaves neither an order nor a consumed cart behind. Online
    /// orders keep the cart and stock untouched until their payment is
    /// verified.
    pub async fn create_from_cart(&self, user_id: Uuid, req: CreateOrder) -> Result<Order, AppError> {
        let payment_method: PaymentMethod = req.payment_method.parse().map_err(|_| {
            AppError::InvalidInput(format!(
                "{} is not a valid payment method",
                req.payment_method
            ))
        })?;

        let cart = self
            .carts
            .find_by_user(user_id)
            .await?
            .filter(|cart| !cart.items.is_empty())
            .ok_or_else(|| AppError::NotFound("Cart is empty".to_string()))?;

        let pharmacy = self
            .catalog
            .find_pharmacy(cart.pharmacy_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Pharmacy not found".to_string()))?;

        if cart.total_amount < pharmacy.minimum_order {
            return Err(AppError::InvalidState(format!(
                "Minimum order amount is ₹{}",
                pharmacy.minimum_order
            )));
        }

        let mut order = Order::from_cart(&cart, req.delivery_address, req.phone, payment_method);
        match order.payment_method {
            PaymentMethod::Cod => self.fulfillment.place(&mut order).await?,
            PaymentMethod::Online => self.orders.insert(&order).await?,
        }

        tracing::info!(
            "Order #{} placed by user {} ({}, total {})",
            order.id,
            user_id,
            order.payment_method,
            order.total_amount
        );

        notifications::publish(self.notifier.as_ref(), OrderEvent::created(&order)).await;

        Ok(order)
    }

    pub async fn get(&self, order_id: Uuid, user_id: Uuid) -> Result<Order, AppError> {
        self.orders
            .find_for_user(order_id, user_id)
            .await?
            .ok_or_else(order_not_found)
    }

    /// Newest first.
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Order>, AppError> {
        Ok(self.orders.list_for_user(user_id).await?)
    }

    /// Moves an order to any status; there is no transition guard.
    ///
    /// Ownership is NOT checked: any authenticated caller can update any
    /// order by id.
    pub async fn update_status(&self, order_id: Uuid, status: &str) -> Result<Order, AppError> {
        let status: OrderStatus = status
            .parse()
            .map_err(|_| AppError::InvalidInput("Invalid status".to_string()))?;

        let order = self
            .orders
            .update_status(order_id, status, Utc::now())
            .await?
            .ok_or_else(order_not_found)?;

        tracing::info!("Order #{} moved to {}", order.id, order.status);

        notifications::publish(self.notifier.as_ref(), OrderEvent::status_updated(&order)).await;

        Ok(order)
    }
}

fn order_not_found() -> AppError {
    AppError::NotFound("Order not found".to_string())
}
