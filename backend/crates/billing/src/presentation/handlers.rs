//! HTTP Handlers

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use kernel::id::{JobId, UserId};
use marketplace::domain::repository::JobRepository;
use platform::identity::Identity;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::config::BillingConfig;
use crate::application::events::PaymentEvents;
use crate::application::{
    CheckoutInput, CheckoutUseCase, CreditsUseCase, DashboardUseCase, FeatureUpgradeUseCase,
    PaymentPurpose, ReconcilePaymentUseCase,
};
use crate::domain::repository::{LedgerRepository, PlanRepository};
use crate::domain::value_objects::PaymentProvider;
use crate::error::{BillingError, BillingResult};
use crate::presentation::dto::{
    CardCheckoutResponse, CheckoutRequestBody, ConfirmCreditsRequest, CreditPurchaseResponse,
    CreditsResponse, CryptoCheckoutResponse, DashboardResponse, GrantCreditsRequest,
    LedgerEntryResponse, PlanResponse, PlansResponse, ProviderResponse, UpgradeRequest,
    UpgradeResponse,
};
use crate::presentation::router::BillingBackend;

/// Shared state for billing handlers
pub struct BillingAppState<B>
where
    B: BillingBackend,
{
    pub repo: Arc<B::Store>,
    pub market: Arc<B::Market>,
    pub card: Arc<B::Card>,
    pub crypto: Arc<B::Crypto>,
    pub config: Arc<BillingConfig>,
    pub events: PaymentEvents,
}

impl<B> Clone for BillingAppState<B>
where
    B: BillingBackend,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            market: self.market.clone(),
            card: self.card.clone(),
            crypto: self.crypto.clone(),
            config: self.config.clone(),
            events: self.events.clone(),
        }
    }
}

impl<B> BillingAppState<B>
where
    B: BillingBackend,
{
    pub(crate) fn reconciler(&self) -> ReconcilePaymentUseCase<B::Store, B::Card, B::Crypto> {
        ReconcilePaymentUseCase::new(
            self.repo.clone(),
            self.card.clone(),
            self.crypto.clone(),
            self.events.clone(),
        )
    }
}

// ============================================================================
// Plans
// ============================================================================

/// GET /api/plans
pub async fn list_plans<B>(
    State(state): State<BillingAppState<B>>,
) -> BillingResult<Json<PlansResponse>>
where
    B: BillingBackend,
{
    let plans = state.repo.list_active_plans().await?;
    let providers = vec![
        ProviderResponse {
            provider: PaymentProvider::Stripe,
            enabled: state.config.stripe.is_some(),
        },
        ProviderResponse {
            provider: PaymentProvider::NowPayments,
            enabled: state.config.nowpayments.is_some(),
        },
    ];
    Ok(Json(PlansResponse {
        plans: plans.into_iter().map(PlanResponse::from).collect(),
        providers,
    }))
}

// ============================================================================
// Checkout
// ============================================================================

fn checkout_input(req: CheckoutRequestBody) -> CheckoutInput {
    CheckoutInput {
        tier: req.tier,
        job_id: req.job_id.map(JobId::from_uuid),
    }
}

/// POST /api/create-payment-intent
pub async fn create_card_payment<B>(
    State(state): State<BillingAppState<B>>,
    Extension(caller): Extension<Identity>,
    Json(req): Json<CheckoutRequestBody>,
) -> BillingResult<(StatusCode, Json<CardCheckoutResponse>)>
where
    B: BillingBackend,
{
    let output = CheckoutUseCase::new(
        state.repo.clone(),
        state.market.clone(),
        state.card.clone(),
        state.config.clone(),
    )
    .execute(&caller, checkout_input(req))
    .await?;
    Ok((StatusCode::CREATED, Json(output.into())))
}

/// POST /api/crypto/create-payment
pub async fn create_crypto_payment<B>(
    State(state): State<BillingAppState<B>>,
    Extension(caller): Extension<Identity>,
    Json(req): Json<CheckoutRequestBody>,
) -> BillingResult<(StatusCode, Json<CryptoCheckoutResponse>)>
where
    B: BillingBackend,
{
    let output = CheckoutUseCase::new(
        state.repo.clone(),
        state.market.clone(),
        state.crypto.clone(),
        state.config.clone(),
    )
    .execute(&caller, checkout_input(req))
    .await?;
    Ok((StatusCode::CREATED, Json(output.into())))
}

// ============================================================================
// Upgrades and credits
// ============================================================================

/// POST /api/jobs/{id}/upgrade-featured
///
/// Empty body spends a credit; `{"paymentIntentId": ...}` confirms a paid
/// upgrade. Confirming for a job deleted before settlement settles the
/// payment as a credit purchase and answers with the credit balance.
pub async fn upgrade_job<B>(
    State(state): State<BillingAppState<B>>,
    Extension(caller): Extension<Identity>,
    Path(job_id): Path<Uuid>,
    body: Bytes,
) -> BillingResult<Response>
where
    B: BillingBackend,
{
    let req: UpgradeRequest = if body.iter().all(u8::is_ascii_whitespace) {
        UpgradeRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| BillingError::Validation(format!("invalid body: {e}")))?
    };
    let job_id = JobId::from_uuid(job_id);

    let Some(external_id) = req.payment_intent_id else {
        let outcome = FeatureUpgradeUseCase::new(state.repo.clone())
            .execute(&caller, job_id)
            .await?;
        return Ok(Json(UpgradeResponse::from_feature(outcome)).into_response());
    };

    let purpose = match state.market.find_job(job_id).await? {
        Some(_) => PaymentPurpose::Job(job_id),
        None => PaymentPurpose::DeletedJob(job_id),
    };
    let outcome = state
        .reconciler()
        .confirm(&caller, &external_id, purpose)
        .await?;

    match state.market.find_job(job_id).await? {
        Some(job) => Ok(Json(UpgradeResponse::from_settlement(
            job_id.into_uuid(),
            job.tier,
            &outcome,
        ))
        .into_response()),
        None => {
            let balance = state.repo.credit_balance(caller.user_id).await?;
            Ok(Json(CreditPurchaseResponse::new(&outcome, balance)).into_response())
        }
    }
}

/// POST /api/credits/add
pub async fn confirm_credit_purchase<B>(
    State(state): State<BillingAppState<B>>,
    Extension(caller): Extension<Identity>,
    Json(req): Json<ConfirmCreditsRequest>,
) -> BillingResult<Json<CreditPurchaseResponse>>
where
    B: BillingBackend,
{
    let outcome = state
        .reconciler()
        .confirm(&caller, &req.payment_intent_id, PaymentPurpose::Credits)
        .await?;
    let balance = state.repo.credit_balance(caller.user_id).await?;
    Ok(Json(CreditPurchaseResponse::new(&outcome, balance)))
}

/// GET /api/credits
pub async fn credits<B>(
    State(state): State<BillingAppState<B>>,
    Extension(caller): Extension<Identity>,
) -> BillingResult<Json<CreditsResponse>>
where
    B: BillingBackend,
{
    let summary = CreditsUseCase::new(state.repo.clone(), state.config.clone())
        .summary(&caller)
        .await?;
    Ok(Json(summary.into()))
}

/// POST /api/admin/credits/grant
pub async fn grant_credits<B>(
    State(state): State<BillingAppState<B>>,
    Extension(caller): Extension<Identity>,
    Json(req): Json<GrantCreditsRequest>,
) -> BillingResult<(StatusCode, Json<LedgerEntryResponse>)>
where
    B: BillingBackend,
{
    let entry = CreditsUseCase::new(state.repo.clone(), state.config.clone())
        .adjust(&caller, UserId::from_uuid(req.user_id), req.amount, req.note)
        .await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

// ============================================================================
// Dashboard
// ============================================================================

/// GET /api/dashboard/stats
pub async fn dashboard_stats<B>(
    State(state): State<BillingAppState<B>>,
    Extension(caller): Extension<Identity>,
) -> BillingResult<Json<DashboardResponse>>
where
    B: BillingBackend,
{
    let stats = DashboardUseCase::new(state.repo.clone(), state.market.clone())
        .stats(&caller)
        .await?;
    Ok(Json(stats.into()))
}
