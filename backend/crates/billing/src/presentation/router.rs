//! Billing Router

use axum::{
    Router, middleware,
    routing::{get, post},
};
use marketplace::{MarketplaceStore, PgMarketplaceRepository};
use platform::identity::{IdentityConfig, require_identity};
use std::sync::Arc;

use crate::application::config::BillingConfig;
use crate::application::events::PaymentEvents;
use crate::domain::gateway::PaymentGateway;
use crate::domain::repository::BillingStore;
use crate::infra::nowpayments::NowPaymentsGateway;
use crate::infra::postgres::PgBillingRepository;
use crate::infra::stripe::StripeGateway;
use crate::presentation::handlers::{self, BillingAppState};
use crate::presentation::{sse, webhooks};

/// The concrete adapters a billing deployment runs with
pub trait BillingBackend: Send + Sync + 'static {
    type Store: BillingStore;
    type Market: MarketplaceStore;
    type Card: PaymentGateway + Sync + 'static;
    type Crypto: PaymentGateway + Sync + 'static;
}

/// PostgreSQL storage with live Stripe and NOWPayments
pub struct PgBillingBackend;

impl BillingBackend for PgBillingBackend {
    type Store = PgBillingRepository;
    type Market = PgMarketplaceRepository;
    type Card = StripeGateway;
    type Crypto = NowPaymentsGateway;
}

/// Create the Billing router with PostgreSQL repositories
pub fn billing_router(
    repo: PgBillingRepository,
    market: PgMarketplaceRepository,
    card: StripeGateway,
    crypto: NowPaymentsGateway,
    config: BillingConfig,
    identity: Arc<IdentityConfig>,
) -> Router {
    let state = BillingAppState::<PgBillingBackend> {
        repo: Arc::new(repo),
        market: Arc::new(market),
        card: Arc::new(card),
        crypto: Arc::new(crypto),
        events: PaymentEvents::new(config.event_buffer),
        config: Arc::new(config),
    };
    billing_router_generic(state, identity)
}

/// Create a generic Billing router for any backend
///
/// Paths are relative; the server nests them under `/api`.
pub fn billing_router_generic<B>(state: BillingAppState<B>, identity: Arc<IdentityConfig>) -> Router
where
    B: BillingBackend,
{
    let public = Router::new()
        .route("/plans", get(handlers::list_plans::<B>))
        .route("/webhooks/stripe", post(webhooks::stripe_webhook::<B>))
        .route(
            "/webhooks/nowpayments",
            post(webhooks::nowpayments_webhook::<B>),
        );

    let authenticated = Router::new()
        // Checkout
        .route(
            "/create-payment-intent",
            post(handlers::create_card_payment::<B>),
        )
        .route(
            "/crypto/create-payment",
            post(handlers::create_crypto_payment::<B>),
        )
        // Upgrades and credits
        .route(
            "/jobs/{id}/upgrade-featured",
            post(handlers::upgrade_job::<B>),
        )
        .route("/credits", get(handlers::credits::<B>))
        .route("/credits/add", post(handlers::confirm_credit_purchase::<B>))
        .route("/dashboard/stats", get(handlers::dashboard_stats::<B>))
        .route("/payments/events", get(sse::payment_events::<B>))
        // Admin
        .route("/admin/credits/grant", post(handlers::grant_credits::<B>))
        .route_layer(middleware::from_fn_with_state(identity, require_identity));

    public.merge(authenticated).with_state(state)
}
