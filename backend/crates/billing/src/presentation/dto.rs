//! Data Transfer Objects

use chrono::{DateTime, Utc};
use marketplace::domain::value_objects::{ApplicationStatus, JobStatus, JobTier};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::events::{PaymentEvent, PaymentEventKind};
use crate::application::{CheckoutOutput, CreditSummary, DashboardStats};
use crate::domain::entities::{AppliedEffect, FeatureOutcome, LedgerEntry, Plan, SettleOutcome};
use crate::domain::value_objects::{LedgerReason, PaymentProvider, PaymentStatus};

// ============================================================================
// Requests
// ============================================================================

/// Body of both checkout endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequestBody {
    pub tier: JobTier,
    /// Omit to buy credits instead of upgrading a job
    #[serde(default)]
    pub job_id: Option<Uuid>,
}

/// Body of `POST /jobs/{id}/upgrade-featured`
///
/// With `paymentIntentId` the client confirms a paid upgrade; without it one
/// credit is spent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeRequest {
    #[serde(default)]
    pub payment_intent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmCreditsRequest {
    pub payment_intent_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantCreditsRequest {
    pub user_id: Uuid,
    pub amount: i64,
    #[serde(default)]
    pub note: Option<String>,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    pub id: Uuid,
    pub name: String,
    pub tier: JobTier,
    pub visibility_days: i32,
    pub price_cents: i64,
    pub credits: i32,
}

impl From<Plan> for PlanResponse {
    fn from(plan: Plan) -> Self {
        Self {
            id: plan.id.into_uuid(),
            name: plan.name,
            tier: plan.tier,
            visibility_days: plan.visibility_days,
            price_cents: plan.price_cents,
            credits: plan.credits,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardCheckoutResponse {
    pub payment_id: Uuid,
    pub payment_intent_id: String,
    pub client_secret: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub tier: JobTier,
}

impl From<CheckoutOutput> for CardCheckoutResponse {
    fn from(out: CheckoutOutput) -> Self {
        Self {
            payment_id: out.payment.id.into_uuid(),
            payment_intent_id: out.payment.external_id,
            client_secret: out.session.client_secret,
            amount: out.payment.amount_cents,
            currency: out.payment.currency,
            tier: out.plan.tier,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoCheckoutResponse {
    pub payment_id: Uuid,
    pub invoice_id: String,
    pub invoice_url: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub tier: JobTier,
}

impl From<CheckoutOutput> for CryptoCheckoutResponse {
    fn from(out: CheckoutOutput) -> Self {
        Self {
            payment_id: out.payment.id.into_uuid(),
            invoice_id: out.payment.external_id,
            invoice_url: out.session.redirect_url,
            amount: out.payment.amount_cents,
            currency: out.payment.currency,
            tier: out.plan.tier,
        }
    }
}

/// Result of a paid confirmation or a credit spend
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeResponse {
    pub job_id: Uuid,
    pub tier: JobTier,
    /// True when nothing changed because the work was already done
    pub already_applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits_balance: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
}

impl UpgradeResponse {
    pub fn from_feature(outcome: FeatureOutcome) -> Self {
        let (job_id, already_applied) = match outcome {
            FeatureOutcome::Upgraded { job_id, .. } => (job_id, false),
            FeatureOutcome::AlreadyPromoted { job_id, .. } => (job_id, true),
        };
        Self {
            job_id: job_id.into_uuid(),
            tier: outcome.tier(),
            already_applied,
            credits_balance: Some(outcome.balance()),
            payment_status: None,
        }
    }

    /// `tier` is the job's tier after settlement
    pub fn from_settlement(job_id: Uuid, tier: JobTier, outcome: &SettleOutcome) -> Self {
        Self {
            job_id,
            tier,
            already_applied: outcome.already_applied(),
            credits_balance: None,
            payment_status: Some(outcome.payment().status),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditPurchaseResponse {
    pub payment_id: Uuid,
    pub payment_status: PaymentStatus,
    pub already_applied: bool,
    pub credits_granted: Option<i64>,
    pub credits_balance: i64,
}

impl CreditPurchaseResponse {
    pub fn new(outcome: &SettleOutcome, credits_balance: i64) -> Self {
        let credits_granted = match outcome {
            SettleOutcome::Settled {
                effect: AppliedEffect::CreditsGranted { amount, .. },
                ..
            } => Some(*amount),
            _ => None,
        };
        Self {
            payment_id: outcome.payment().id.into_uuid(),
            payment_status: outcome.payment().status,
            already_applied: outcome.already_applied(),
            credits_granted,
            credits_balance,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryResponse {
    pub id: Uuid,
    pub amount: i64,
    pub balance: i64,
    pub reason: LedgerReason,
    pub tier: Option<JobTier>,
    pub payment_id: Option<Uuid>,
    pub job_id: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<LedgerEntry> for LedgerEntryResponse {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            id: entry.id.into_uuid(),
            amount: entry.amount,
            balance: entry.balance,
            reason: entry.reason,
            tier: entry.tier,
            payment_id: entry.payment_id.map(|id| id.into_uuid()),
            job_id: entry.job_id.map(|id| id.into_uuid()),
            note: entry.note,
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditsResponse {
    pub balance: i64,
    pub entries: Vec<LedgerEntryResponse>,
}

impl From<CreditSummary> for CreditsResponse {
    fn from(summary: CreditSummary) -> Self {
        Self {
            balance: summary.balance,
            entries: summary.entries.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount<S> {
    pub status: S,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub credits_balance: i64,
    pub total_jobs: i64,
    pub active_jobs: i64,
    pub promoted_jobs: i64,
    pub total_views: i64,
    pub total_applications_received: i64,
    pub jobs_by_status: Vec<StatusCount<JobStatus>>,
    pub my_applications: Vec<StatusCount<ApplicationStatus>>,
}

impl From<DashboardStats> for DashboardResponse {
    fn from(stats: DashboardStats) -> Self {
        let jobs = stats.jobs;
        Self {
            credits_balance: stats.credits_balance,
            total_jobs: jobs.by_status.iter().map(|(_, n)| n).sum(),
            active_jobs: jobs.count(JobStatus::Active),
            promoted_jobs: jobs.promoted,
            total_views: jobs.total_views,
            total_applications_received: jobs.total_applications,
            jobs_by_status: jobs
                .by_status
                .into_iter()
                .map(|(status, count)| StatusCount { status, count })
                .collect(),
            my_applications: stats
                .applications
                .into_iter()
                .map(|(status, count)| StatusCount { status, count })
                .collect(),
        }
    }
}

/// Payload of one SSE frame
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEventResponse {
    #[serde(rename = "type")]
    pub kind: PaymentEventKind,
    pub payment_id: Uuid,
    pub external_id: String,
    pub job_id: Option<Uuid>,
    pub tier: Option<JobTier>,
    pub credits_balance: Option<i64>,
    pub occurred_at: DateTime<Utc>,
}

impl From<&PaymentEvent> for PaymentEventResponse {
    fn from(event: &PaymentEvent) -> Self {
        Self {
            kind: event.kind,
            payment_id: event.payment_id.into_uuid(),
            external_id: event.external_id.clone(),
            job_id: event.job_id.map(|id| id.into_uuid()),
            tier: event.tier,
            credits_balance: event.credits_balance,
            occurred_at: event.occurred_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub received: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResponse {
    pub provider: PaymentProvider,
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlansResponse {
    pub plans: Vec<PlanResponse>,
    pub providers: Vec<ProviderResponse>,
}
