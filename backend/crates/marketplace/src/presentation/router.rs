//! Marketplace Router

use axum::{
    Router, middleware,
    routing::{get, post},
};
use platform::identity::{IdentityConfig, require_identity};
use std::sync::Arc;

use crate::application::config::MarketplaceConfig;
use crate::domain::repository::MarketplaceStore;
use crate::infra::postgres::PgMarketplaceRepository;
use crate::presentation::handlers::{self, MarketplaceAppState};

/// Create the Marketplace router with PostgreSQL repository
pub fn marketplace_router(
    repo: PgMarketplaceRepository,
    config: MarketplaceConfig,
    identity: Arc<IdentityConfig>,
) -> Router {
    marketplace_router_generic(repo, config, identity)
}

/// Create a generic Marketplace router for any repository implementation
///
/// Paths are relative; the server nests them under `/api`.
pub fn marketplace_router_generic<R>(
    repo: R,
    config: MarketplaceConfig,
    identity: Arc<IdentityConfig>,
) -> Router
where
    R: MarketplaceStore,
{
    let state = MarketplaceAppState {
        repo: Arc::new(repo),
        config: Arc::new(config),
    };

    let public = Router::new()
        .route("/jobs", get(handlers::list_jobs::<R>))
        .route("/jobs/{id}", get(handlers::get_job::<R>));

    let authenticated = Router::new()
        // Companies
        .route("/companies", post(handlers::create_company::<R>))
        .route("/companies/mine", get(handlers::my_companies::<R>))
        .route(
            "/companies/{id}",
            get(handlers::get_company::<R>).delete(handlers::delete_company::<R>),
        )
        .route("/companies/{id}/members", post(handlers::add_member::<R>))
        .route(
            "/companies/{id}/jobs",
            get(handlers::company_jobs::<R>).post(handlers::create_job::<R>),
        )
        // Jobs
        .route("/jobs/{id}/manage", get(handlers::manage_job::<R>))
        .route("/jobs/{id}/submit", post(handlers::submit_job::<R>))
        .route("/jobs/{id}/apply", post(handlers::apply::<R>))
        .route(
            "/jobs/{id}/applications",
            get(handlers::job_applications::<R>),
        )
        .route(
            "/jobs/{id}/save",
            post(handlers::save_job::<R>).delete(handlers::unsave_job::<R>),
        )
        .route("/saved-jobs", get(handlers::saved_jobs::<R>))
        // Applications
        .route("/applications/mine", get(handlers::my_applications::<R>))
        .route(
            "/applications/{id}/status",
            post(handlers::update_application_status::<R>),
        )
        .route(
            "/applications/{id}/withdraw",
            post(handlers::withdraw_application::<R>),
        )
        .route(
            "/applications/{id}/messages",
            get(handlers::list_messages::<R>).post(handlers::post_message::<R>),
        )
        .route(
            "/applications/{id}/messages/read",
            post(handlers::mark_messages_read::<R>),
        )
        // Admin moderation
        .route("/admin/jobs/pending", get(handlers::pending_jobs::<R>))
        .route("/admin/jobs/{id}/approve", post(handlers::approve_job::<R>))
        .route("/admin/jobs/{id}/reject", post(handlers::reject_job::<R>))
        .route_layer(middleware::from_fn_with_state(identity, require_identity));

    public.merge(authenticated).with_state(state)
}
