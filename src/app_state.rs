use std::sync::Arc;

use crate::{
    api::PaymentProvider,
    config::PaymentsConfig,
    repositories::Repositories,
    services::{
        carts::CartService, catalog::CatalogService, fulfillment::FulfillmentService,
        notifications::NotificationEmitter, orders::OrderService, payments::PaymentService,
    },
};

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub carts: CartService,
    pub orders: OrderService,
    pub payments: PaymentService,
}

impl AppState {
    /// Wires the services over the given repositories. `provider` is `None`
    /// when no payment provider credentials are configured.
    pub fn new(
        repos: Repositories,
        notifier: Arc<dyn NotificationEmitter>,
        provider: Option<Arc<dyn PaymentProvider>>,
        payments: PaymentsConfig,
    ) -> Self {
        let fulfillment = FulfillmentService::new(repos.orders.clone());

        Self {
            catalog: CatalogService::new(repos.catalog.clone()),
            carts: CartService::new(repos.catalog.clone(), repos.carts.clone()),
            orders: OrderService::new(
                repos.catalog,
                repos.carts,
                repos.orders.clone(),
                fulfillment.clone(),
                notifier,
            ),
            payments: PaymentService::new(
                repos.orders,
                repos.transactions,
                repos.payment_methods,
                fulfillment,
                provider,
                payments,
            ),
        }
    }
}
