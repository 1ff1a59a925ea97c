//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

mod config;

use axum::{
    Router, http,
    http::{Method, header},
};
use billing::{NowPaymentsGateway, PgBillingRepository, StripeGateway, billing_router};
use marketplace::application::ExpireJobsUseCase;
use marketplace::{PgMarketplaceRepository, marketplace_router};
use platform::identity::IdentityConfig;
use platform::outbound::http_client;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ApiConfig;

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

/// Expire due jobs now, then every `interval` until the process exits
fn spawn_expiry_sweep(repo: PgMarketplaceRepository, interval: Duration) {
    let sweep = ExpireJobsUseCase::new(Arc::new(repo));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            // The first tick completes immediately, covering the startup sweep
            ticker.tick().await;
            if let Err(e) = sweep.execute().await {
                tracing::warn!(error = %e, "Job expiry sweep failed, retrying next interval");
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "api=info,marketplace=info,billing=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ApiConfig::from_env(cfg!(debug_assertions))?;

    // Database connection
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    let market_repo = PgMarketplaceRepository::new(pool.clone());
    spawn_expiry_sweep(market_repo.clone(), config.marketplace.expiry_sweep_interval);

    // Payment providers
    let client = http_client(config.billing.provider_timeout)?;
    tracing::info!(
        card = config.billing.stripe.is_some(),
        crypto = config.billing.nowpayments.is_some(),
        "Payment providers configured"
    );
    let card = StripeGateway::new(client.clone(), config.billing.stripe.clone());
    let crypto = NowPaymentsGateway::new(client, config.billing.nowpayments.clone());

    let identity = Arc::new(IdentityConfig {
        secret: config.identity_secret,
        ..IdentityConfig::default()
    });

    // CORS configuration
    let allowed_origins: Vec<http::HeaderValue> = config
        .frontend_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true);

    // Build router
    let api = marketplace_router(market_repo.clone(), config.marketplace, identity.clone())
        .merge(billing_router(
            PgBillingRepository::new(pool),
            market_repo,
            card,
            crypto,
            config.billing,
            identity,
        ));

    let app = Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = config.bind_addr;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
