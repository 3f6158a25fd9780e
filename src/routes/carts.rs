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
    domain::Cart,
    middleware,
};

/// Cart routes of the authenticated user.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(utoipa_axum::routes!(get_cart, clear_cart))
        .routes(utoipa_axum::routes!(add_cart_item))
        .routes(utoipa_axum::routes!(update_cart_item, remove_cart_item))
        .route_layer(axum::middleware::from_fn(middleware::users_authorization))
}

#[derive(Deserialize, ToSchema)]
struct AddCartItemReq {
    pub medicine_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Deserialize, ToSchema)]
struct UpdateCartItemReq {
    pub quantity: i32,
}

/// Fetch the cart of the authenticated user. `data` is null when there is
/// no cart.
#[utoipa::path(
    get,
    path = "/cart",
    tags = ["Cart"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get cart successfully", body = StdResponse<Cart, String>)
    )
)]
async fn get_cart(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let cart = state.carts.get(user_id).await?;

    Ok(StdResponse {
        data: cart,
        message: Some("Get cart successfully"),
    })
}

#[utoipa::path(
    post,
    path = "/cart/items",
    tags = ["Cart"],
    security(("bearerAuth" = [])),
    request_body = AddCartItemReq,
    responses(
        (status = 200, description = "Item added to cart", body = StdResponse<Cart, String>),
        (status = 404, description = "Medicine not found"),
        (status = 409, description = "Cart holds items of another pharmacy"),
        (status = 422, description = "Insufficient stock")
    )
)]
async fn add_cart_item(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<AddCartItemReq>,
) -> Result<impl IntoResponse, AppError> {
    let cart = state
        .carts
        .add(user_id, req.medicine_id, req.quantity)
        .await?;

    Ok(StdResponse {
        data: Some(cart),
        message: Some("Item added to cart"),
    })
}

/// Set the quantity of a cart item. Zero removes it.
#[utoipa::path(
    patch,
    path = "/cart/items/{medicine_id}",
    tags = ["Cart"],
    security(("bearerAuth" = [])),
    params(
        ("medicine_id" = Uuid, Path, description = "Medicine of the cart item")
    ),
    request_body = UpdateCartItemReq,
    responses(
        (status = 200, description = "Cart item updated", body = StdResponse<Cart, String>),
        (status = 404, description = "Cart or item not found"),
        (status = 422, description = "Insufficient stock")
    )
)]
async fn update_cart_item(
    Path(medicine_id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<UpdateCartItemReq>,
) -> Result<impl IntoResponse, AppError> {
    let cart = state
        .carts
        .update_quantity(user_id, medicine_id, req.quantity)
        .await?;

    Ok(StdResponse {
        data: cart,
        message: Some("Cart item updated"),
    })
}

#[utoipa::path(
    delete,
    path = "/cart/items/{medicine_id}",
    tags = ["Cart"],
    security(("bearerAuth" = [])),
    params(
        ("medicine_id" = Uuid, Path, description = "Medicine to remove from the cart")
    ),
    responses(
        (status = 200, description = "Item removed from cart", body = StdResponse<Cart, String>),
        (status = 404, description = "Cart not found")
    )
)]
async fn remove_cart_item(
    Path(medicine_id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let cart = state.carts.remove(user_id, medicine_id).await?;

    Ok(StdResponse {
        data: cart,
        message: Some("Item removed from cart"),
    })
}

#[utoipa::path(
    delete,
    path = "/cart",
    tags = ["Cart"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Cart cleared", body = StdResponse<String, String>)
    )
)]
async fn clear_cart(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.carts.clear(user_id).await?;

    Ok(StdResponse::<(), _> {
        data: None,
        message: Some("Cart cleared"),
    })
}
