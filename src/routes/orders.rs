use anyhow::Result;
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    domain::Order,
    middleware,
    services::orders::CreateOrder,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(utoipa_axum::routes!(create_order, get_orders))
        .routes(utoipa_axum::routes!(get_order))
        .routes(utoipa_axum::routes!(update_order_status))
        .route_layer(axum::middleware::from_fn(middleware::users_authorization))
}

#[derive(Deserialize, ToSchema)]
struct UpdateOrderStatusReq {
    /// One of `placed`, `confirmed`, `preparing`, `out_for_delivery`,
    /// `delivered`, `cancelled`.
    pub status: String,
}

/// Place an order from the authenticated user's cart.
#[utoipa::path(
    post,
    path = "/orders",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    request_body = CreateOrder,
    responses(
        (status = 200, description = "Order placed", body = StdResponse<Order, String>),
        (status = 400, description = "Unknown payment method"),
        (status = 404, description = "Cart is empty or its pharmacy is gone"),
        (status = 422, description = "Minimum order amount not met")
    )
)]
async fn create_order(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateOrder>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders.create_from_cart(user_id, req).await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Order placed successfully"),
    })
}

/// Fetch all orders of the authenticated user, newest first.
#[utoipa::path(
    get,
    path = "/orders",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List my orders", body = StdResponse<Vec<Order>, String>)
    )
)]
async fn get_orders(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let orders = state.orders.list(user_id).await?;

    Ok(StdResponse {
        data: Some(orders),
        message: Some("Get my orders successfully"),
    })
}

/// Fetch a specific order belonging to the authenticated user.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Order ID to fetch")
    ),
    responses(
        (status = 200, description = "Get order successfully", body = StdResponse<Order, String>),
        (status = 404, description = "Order not found")
    )
)]
async fn get_order(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders.get(id, user_id).await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Get order successfully"),
    })
}

/// Move an order to a new status.
///
/// Any authenticated user may call this for any order.
#[utoipa::path(
    put,
    path = "/orders/{id}/status",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Order ID to update")
    ),
    request_body = UpdateOrderStatusReq,
    responses(
        (status = 200, description = "Order status updated", body = StdResponse<Order, String>),
        (status = 400, description = "Invalid status"),
        (status = 404, description = "Order not found")
    )
)]
async fn update_order_status(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(req): Json<UpdateOrderStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders.update_status(id, &req.status).await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Order status updated"),
    })
}
