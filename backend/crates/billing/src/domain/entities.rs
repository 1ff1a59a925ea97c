//! Domain Entities

use chrono::{DateTime, Utc};
use kernel::id::{JobId, LedgerEntryId, PaymentId, PlanId, UserId};
use marketplace::domain::value_objects::JobTier;

use crate::domain::value_objects::{LedgerReason, PaymentProvider, PaymentStatus};
use crate::error::{BillingError, BillingResult};

// ============================================================================
// Plan
// ============================================================================

/// A purchasable promotion package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    pub tier: JobTier,
    pub visibility_days: i32,
    pub price_cents: i64,
    /// Credits granted when bought without a job
    pub credits: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Plan {
    pub fn new(
        name: impl Into<String>,
        tier: JobTier,
        visibility_days: i32,
        price_cents: i64,
        credits: i32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PlanId::new(),
            name: name.into(),
            tier,
            visibility_days,
            price_cents,
            credits,
            is_active: true,
            created_at: now,
        }
    }

    /// Catalogue seeded on a fresh database
    pub fn default_catalogue(now: DateTime<Utc>) -> Vec<Plan> {
        vec![
            Plan::new("Featured", JobTier::Featured, 30, 9_900, 1, now),
            Plan::new("Premium", JobTier::Premium, 60, 19_900, 1, now),
        ]
    }
}

// ============================================================================
// Payment
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    pub id: PaymentId,
    pub user_id: UserId,
    pub plan_id: PlanId,
    /// `None` for a credit purchase, or once the job was deleted
    pub job_id: Option<JobId>,
    pub provider: PaymentProvider,
    /// Stripe PaymentIntent id or NOWPayments invoice id
    pub external_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

/// What settling a payment must do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    UpgradeJob {
        job_id: JobId,
        tier: JobTier,
        visibility_days: i32,
    },
    GrantCredits {
        amount: i64,
        tier: JobTier,
    },
}

impl Payment {
    #[allow(clippy::too_many_arguments)]
    pub fn pending(
        id: PaymentId,
        user_id: UserId,
        plan: &Plan,
        job_id: Option<JobId>,
        provider: PaymentProvider,
        external_id: String,
        currency: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            plan_id: plan.id,
            job_id,
            provider,
            external_id,
            amount_cents: plan.price_cents,
            currency,
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
            settled_at: None,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.status == PaymentStatus::Succeeded
    }

    /// Effect of settlement under `plan`
    ///
    /// A payment whose job is gone falls back to the plan's credits so the
    /// buyer keeps what they paid for.
    pub fn settlement(&self, plan: &Plan) -> Settlement {
        match self.job_id {
            Some(job_id) => Settlement::UpgradeJob {
                job_id,
                tier: plan.tier,
                visibility_days: plan.visibility_days,
            },
            None => Settlement::GrantCredits {
                amount: i64::from(plan.credits),
                tier: plan.tier,
            },
        }
    }

    pub fn mark_succeeded(&mut self, now: DateTime<Utc>) {
        self.status = PaymentStatus::Succeeded;
        self.settled_at = Some(now);
        self.updated_at = now;
    }

    /// pending → failed; any other status is left alone
    pub fn mark_failed(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != PaymentStatus::Pending {
            return false;
        }
        self.status = PaymentStatus::Failed;
        self.updated_at = now;
        true
    }
}

// ============================================================================
// Credit ledger
// ============================================================================

/// One append-only row of a user's credit history
///
/// `balance` is the running total after `amount` was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub user_id: UserId,
    pub amount: i64,
    pub balance: i64,
    pub reason: LedgerReason,
    pub tier: Option<JobTier>,
    pub payment_id: Option<PaymentId>,
    pub job_id: Option<JobId>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Next row on top of `previous_balance`
    ///
    /// Fails with `InsufficientCredits` when the result would be negative.
    pub fn append(
        previous_balance: i64,
        user_id: UserId,
        amount: i64,
        reason: LedgerReason,
        now: DateTime<Utc>,
    ) -> BillingResult<Self> {
        if amount == 0 {
            return Err(BillingError::Validation("amount must not be zero".into()));
        }
        let balance = previous_balance
            .checked_add(amount)
            .ok_or_else(|| BillingError::Validation("amount out of range".into()))?;
        if balance < 0 {
            return Err(BillingError::InsufficientCredits);
        }

        Ok(Self {
            id: LedgerEntryId::new(),
            user_id,
            amount,
            balance,
            reason,
            tier: None,
            payment_id: None,
            job_id: None,
            note: None,
            created_at: now,
        })
    }

    /// Spend one credit on `job_id`
    pub fn debit_for_feature(
        previous_balance: i64,
        user_id: UserId,
        job_id: JobId,
        now: DateTime<Utc>,
    ) -> BillingResult<Self> {
        if previous_balance <= 0 {
            return Err(BillingError::InsufficientCredits);
        }
        let mut entry = Self::append(previous_balance, user_id, -1, LedgerReason::FeatureUpgrade, now)?;
        entry.tier = Some(JobTier::Featured);
        entry.job_id = Some(job_id);
        Ok(entry)
    }

    /// Credits bought through `payment`
    pub fn purchase(
        previous_balance: i64,
        payment: &Payment,
        amount: i64,
        tier: JobTier,
        now: DateTime<Utc>,
    ) -> BillingResult<Self> {
        let mut entry = Self::append(
            previous_balance,
            payment.user_id,
            amount,
            LedgerReason::Purchase,
            now,
        )?;
        entry.tier = Some(tier);
        entry.payment_id = Some(payment.id);
        Ok(entry)
    }

    /// Manual correction by an administrator
    pub fn adjustment(
        previous_balance: i64,
        user_id: UserId,
        amount: i64,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> BillingResult<Self> {
        let reason = if amount >= 0 {
            LedgerReason::AdminGrant
        } else {
            LedgerReason::AdminRevoke
        };
        let mut entry = Self::append(previous_balance, user_id, amount, reason, now)?;
        entry.note = note;
        Ok(entry)
    }
}

// ============================================================================
// Webhook audit
// ============================================================================

/// A verified provider notification, kept for audit and replay detection
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEvent {
    pub provider: PaymentProvider,
    pub event_id: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

// ============================================================================
// Outcomes
// ============================================================================

/// What a settlement changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppliedEffect {
    JobUpgraded {
        job_id: JobId,
        tier: JobTier,
        published: bool,
    },
    CreditsGranted {
        amount: i64,
        balance: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleOutcome {
    /// This call moved the payment to `succeeded`
    Settled {
        payment: Payment,
        effect: AppliedEffect,
    },
    /// Someone else got there first; nothing changed
    AlreadySettled { payment: Payment },
}

impl SettleOutcome {
    pub fn payment(&self) -> &Payment {
        match self {
            SettleOutcome::Settled { payment, .. } | SettleOutcome::AlreadySettled { payment } => {
                payment
            }
        }
    }

    pub fn already_applied(&self) -> bool {
        matches!(self, SettleOutcome::AlreadySettled { .. })
    }
}

/// Result of spending a credit on a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureOutcome {
    Upgraded { job_id: JobId, balance: i64 },
    /// Job was already promoted; no credit spent
    AlreadyPromoted {
        job_id: JobId,
        tier: JobTier,
        balance: i64,
    },
}

impl FeatureOutcome {
    pub fn balance(&self) -> i64 {
        match self {
            FeatureOutcome::Upgraded { balance, .. }
            | FeatureOutcome::AlreadyPromoted { balance, .. } => *balance,
        }
    }

    pub fn tier(&self) -> JobTier {
        match self {
            FeatureOutcome::Upgraded { .. } => JobTier::Featured,
            FeatureOutcome::AlreadyPromoted { tier, .. } => *tier,
        }
    }
}
