//! Repository Traits
//!
//! Interfaces for data persistence. Implementations live in the infra layer.

use chrono::{DateTime, Utc};
use kernel::id::{JobId, PaymentId, PlanId, UserId};
use marketplace::domain::value_objects::JobTier;

use crate::domain::entities::{FeatureOutcome, LedgerEntry, Payment, Plan, SettleOutcome, WebhookEvent};
use crate::error::BillingResult;

/// Plan catalogue
#[trait_variant::make(PlanRepository: Send)]
pub trait LocalPlanRepository {
    /// Active plans, cheapest first
    async fn list_active_plans(&self) -> BillingResult<Vec<Plan>>;

    /// The oldest active plan selling `tier`
    async fn active_plan_for_tier(&self, tier: JobTier) -> BillingResult<Option<Plan>>;

    async fn find_plan(&self, plan_id: PlanId) -> BillingResult<Option<Plan>>;
}

/// Payments and their settlement
#[trait_variant::make(PaymentRepository: Send)]
pub trait LocalPaymentRepository {
    /// Record a freshly created intent or invoice
    ///
    /// Keyed by `external_id`: when a row already exists it is returned
    /// unchanged, so the caller can check who owns it.
    async fn insert_pending(&self, payment: &Payment) -> BillingResult<Payment>;

    async fn find_payment(&self, payment_id: PaymentId) -> BillingResult<Option<Payment>>;

    async fn find_payment_by_external_id(&self, external_id: &str)
    -> BillingResult<Option<Payment>>;

    /// Mark the payment succeeded and apply its effect, exactly once
    ///
    /// The status change, the job upgrade or credit grant, and the ledger row
    /// commit together. A second call for the same payment returns
    /// `AlreadySettled` without touching anything.
    async fn settle_payment(
        &self,
        external_id: &str,
        now: DateTime<Utc>,
    ) -> BillingResult<SettleOutcome>;

    /// pending → failed. Returns the payment when this call moved it.
    async fn fail_payment(
        &self,
        external_id: &str,
        now: DateTime<Utc>,
    ) -> BillingResult<Option<Payment>>;

    /// Store a verified webhook. Returns false when it was already seen.
    async fn record_webhook_event(&self, event: &WebhookEvent) -> BillingResult<bool>;
}

/// Append-only credit ledger
#[trait_variant::make(LedgerRepository: Send)]
pub trait LocalLedgerRepository {
    /// Balance of the most recent row, zero without history
    async fn credit_balance(&self, user_id: UserId) -> BillingResult<i64>;

    /// Newest first
    async fn ledger_history(&self, user_id: UserId, limit: u32) -> BillingResult<Vec<LedgerEntry>>;

    /// Spend one credit to feature `job_id`
    ///
    /// Checks membership and balance, writes the debit and flips the tier in
    /// one atomic step. Concurrent calls for the same user serialize, so a
    /// balance of one pays for exactly one upgrade.
    async fn spend_credit_on_job(
        &self,
        user_id: UserId,
        job_id: JobId,
        now: DateTime<Utc>,
    ) -> BillingResult<FeatureOutcome>;

    /// Manual grant (positive) or revoke (negative)
    async fn adjust_credits(
        &self,
        user_id: UserId,
        amount: i64,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> BillingResult<LedgerEntry>;
}

/// Everything the billing handlers need from storage
pub trait BillingStore:
    PlanRepository + PaymentRepository + LedgerRepository + Clone + Send + Sync + 'static
{
}

impl<T> BillingStore for T where
    T: PlanRepository + PaymentRepository + LedgerRepository + Clone + Send + Sync + 'static
{
}
