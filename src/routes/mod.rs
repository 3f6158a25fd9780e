use axum::{Extension, Router};
use utoipa_axum::router::OpenApiRouter;

use crate::{app_state::AppState, middleware::JwtVerifier};

pub mod carts;
pub mod catalog;
pub mod orders;
pub mod payments;

/// Every route of the service under `/api`.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/api",
        catalog::routes_with_openapi()
            .merge(carts::routes_with_openapi())
            .merge(orders::routes_with_openapi())
            .merge(payments::routes_with_openapi()),
    )
}

/// The HTTP API with its state and token verifier attached, without the
/// documentation or Socket.IO layers.
pub fn app(state: AppState, verifier: JwtVerifier) -> Router {
    let (router, _) = routes_with_openapi().split_for_parts();
    router.with_state(state).layer(Extension(verifier))
}
