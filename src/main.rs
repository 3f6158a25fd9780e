use std::sync::Arc;

use anyhow::Result;
use axum::{Extension, Router};
use diesel_migrations::{EmbeddedMigrations, embed_migrations};
use medimart_orderservice::{
    api::{PaymentProvider, razorpay::RazorpayClient},
    app_state::AppState,
    bootstrap, config, db,
    middleware::JwtVerifier,
    repositories::{Repositories, postgres::PgRepository},
    routes,
    services::notifications::SocketIoEmitter,
    socket, swagger,
};
use socketioxide::SocketIo;
use tower_http::trace::TraceLayer;

/// Migrations embedded into the binary which helps with streamlining image building process
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_env();
    bootstrap::init_tracing();

    let config = config::load()?;

    let (routes, mut openapi) = routes::routes_with_openapi().split_for_parts();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("MediMart OrderService API")
        .version("1.0.0")
        .build();
    let swagger_ui = swagger::create_swagger_ui(openapi);

    tracing::info!("Running migrations...");
    let migrations_count = db::run_migrations_blocking(MIGRATIONS, &config.database.url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    let pool = db::connect(&config.database).await?;
    let repos = Repositories::from_store(PgRepository::new(pool));

    let (socket_layer, io) = SocketIo::new_layer();
    io.ns("/", socket::on_connect);

    let provider: Option<Arc<dyn PaymentProvider>> = match config.payments.credentials() {
        Some((key_id, key_secret)) => Some(Arc::new(RazorpayClient::new(
            reqwest::Client::new(),
            &config.payments.api_url,
            key_id,
            key_secret,
        ))),
        None => {
            tracing::warn!("Payment provider credentials missing, online payments are disabled");
            None
        }
    };

    let state = AppState::new(
        repos,
        Arc::new(SocketIoEmitter::new(io)),
        provider,
        config.payments.clone(),
    );

    let app = Router::new()
        .merge(routes.with_state(state))
        .merge(swagger_ui)
        .layer(Extension(JwtVerifier::new(&config.auth.jwt_secret)))
        .layer(socket_layer)
        .layer(TraceLayer::new_for_http());

    tracing::info!("Bootstrapping...");
    bootstrap::serve("OrderService", app, &config.server).await
}
