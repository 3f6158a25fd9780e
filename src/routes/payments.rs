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
    domain::{Order, SavedPaymentMethod, Transaction},
    middleware,
    services::payments::{ProviderCheckout, SavePaymentMethod, VerifyPayment},
};

/// Defines routes with OpenAPI specs.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/payments",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_provider_order))
            .routes(utoipa_axum::routes!(verify_payment))
            .routes(utoipa_axum::routes!(get_transaction))
            .routes(utoipa_axum::routes!(get_payment_methods, save_payment_method))
            .routes(utoipa_axum::routes!(delete_payment_method))
            .routes(utoipa_axum::routes!(set_default_payment_method))
            .route_layer(axum::middleware::from_fn(middleware::users_authorization)),
    )
}

#[derive(Deserialize, ToSchema)]
struct CreateProviderOrderReq {
    pub order_id: Uuid,
}

/// Open an online payment for an order with the payment provider.
#[utoipa::path(
    post,
    path = "/provider-orders",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    request_body = CreateProviderOrderReq,
    responses(
        (status = 200, description = "Provider order created", body = StdResponse<ProviderCheckout, String>),
        (status = 404, description = "Order not found"),
        (status = 502, description = "Payment provider unreachable"),
        (status = 503, description = "Payment service not configured")
    )
)]
async fn create_provider_order(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateProviderOrderReq>,
) -> Result<impl IntoResponse, AppError> {
    let checkout = state
        .payments
        .create_provider_order(req.order_id, user_id)
        .await?;

    Ok(StdResponse {
        data: Some(checkout),
        message: Some("Provider order created"),
    })
}

/// Verify the signature returned by the provider's checkout.
#[utoipa::path(
    post,
    path = "/verify",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    request_body = VerifyPayment,
    responses(
        (status = 200, description = "Payment verified", body = StdResponse<Order, String>),
        (status = 400, description = "Payment verification failed"),
        (status = 404, description = "Order not found"),
        (status = 503, description = "Payment service not configured")
    )
)]
async fn verify_payment(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<VerifyPayment>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.payments.verify(req, user_id).await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Payment verified successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/transactions/{order_id}",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    params(
        ("order_id" = Uuid, Path, description = "Order whose latest transaction to fetch")
    ),
    responses(
        (status = 200, description = "Get transaction successfully", body = StdResponse<Transaction, String>),
        (status = 404, description = "Transaction not found")
    )
)]
async fn get_transaction(
    Path(order_id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let transaction = state.payments.transaction(order_id, user_id).await?;

    Ok(StdResponse {
        data: Some(transaction),
        message: Some("Get transaction successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/methods",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List my payment methods", body = StdResponse<Vec<SavedPaymentMethod>, String>)
    )
)]
async fn get_payment_methods(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let methods = state.payments.list_methods(user_id).await?;

    Ok(StdResponse {
        data: Some(methods),
        message: Some("Get payment methods successfully"),
    })
}

#[utoipa::path(
    post,
    path = "/methods",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    request_body = SavePaymentMethod,
    responses(
        (status = 200, description = "Payment method saved", body = StdResponse<SavedPaymentMethod, String>),
        (status = 400, description = "Invalid payment method")
    )
)]
async fn save_payment_method(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<SavePaymentMethod>,
) -> Result<impl IntoResponse, AppError> {
    let method = state.payments.save_method(user_id, req).await?;

    Ok(StdResponse {
        data: Some(method),
        message: Some("Payment method saved"),
    })
}

#[utoipa::path(
    delete,
    path = "/methods/{id}",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Payment method ID to delete")
    ),
    responses(
        (status = 200, description = "Payment method deleted", body = StdResponse<String, String>),
        (status = 404, description = "Payment method not found")
    )
)]
async fn delete_payment_method(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.payments.delete_method(id, user_id).await?;

    Ok(StdResponse::<(), _> {
        data: None,
        message: Some("Payment method deleted"),
    })
}

/// Make a payment method the user's default.
#[utoipa::path(
    put,
    path = "/methods/{id}/default",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Payment method ID to make default")
    ),
    responses(
        (status = 200, description = "Default payment method updated", body = StdResponse<SavedPaymentMethod, String>),
        (status = 404, description = "Payment method not found")
    )
)]
async fn set_default_payment_method(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let method = state.payments.set_default_method(id, user_id).await?;

    Ok(StdResponse {
        data: Some(method),
        message: Some("Default payment method updated"),
    })
}
