//! PostgreSQL Repository Implementations
//!
//! Lock order inside every transaction: payment row, then job row, then the
//! user's ledger advisory lock. Keeping one order rules out deadlocks between
//! settlement and credit spend.

use chrono::{DateTime, Utc};
use kernel::id::{JobId, LedgerEntryId, PaymentId, PlanId, UserId};
use marketplace::domain::entities::Job;
use marketplace::domain::value_objects::JobTier;
use marketplace::infra::postgres::{JOB_COLUMNS, JobRow};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::entities::{
    AppliedEffect, FeatureOutcome, LedgerEntry, Payment, Plan, SettleOutcome, Settlement,
    WebhookEvent,
};
use crate::domain::repository::{LedgerRepository, PaymentRepository, PlanRepository};
use crate::domain::value_objects::{LedgerReason, PaymentProvider, PaymentStatus};
use crate::error::{BillingError, BillingResult};

const PLAN_COLUMNS: &str =
    "plan_id, name, tier, visibility_days, price_cents, credits, is_active, created_at";

const PAYMENT_COLUMNS: &str = "payment_id, user_id, plan_id, job_id, provider, external_id, \
     amount_cents, currency, status, created_at, updated_at, settled_at";

const LEDGER_COLUMNS: &str =
    "ledger_entry_id, user_id, amount, balance, reason, tier, payment_id, job_id, note, created_at";

/// PostgreSQL-backed repository
#[derive(Clone)]
pub struct PgBillingRepository {
    pool: PgPool,
}

impl PgBillingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Ledger helpers (run inside a caller's transaction)
// ============================================================================

/// Serialize ledger writers for one user until the transaction ends
async fn lock_ledger(conn: &mut PgConnection, user_id: UserId) -> BillingResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
        .bind(user_id.into_uuid())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn latest_balance(conn: &mut PgConnection, user_id: UserId) -> BillingResult<i64> {
    let balance: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT balance FROM credit_ledger
        WHERE user_id = $1
        ORDER BY created_at DESC, ledger_seq DESC
        LIMIT 1
        "#,
    )
    .bind(user_id.into_uuid())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(balance.unwrap_or(0))
}

/// Insert `entry`, stamping it with the database clock
///
/// `clock_timestamp()` keeps rows of one user strictly ordered even when two
/// transactions started with the same `now()`.
async fn insert_ledger_entry(
    conn: &mut PgConnection,
    entry: &LedgerEntry,
) -> BillingResult<DateTime<Utc>> {
    let created_at: DateTime<Utc> = sqlx::query_scalar(
        r#"
        INSERT INTO credit_ledger (
            ledger_entry_id, user_id, amount, balance, reason, tier,
            payment_id, job_id, note, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, clock_timestamp())
        RETURNING created_at
        "#,
    )
    .bind(entry.id.into_uuid())
    .bind(entry.user_id.into_uuid())
    .bind(entry.amount)
    .bind(entry.balance)
    .bind(entry.reason.code())
    .bind(entry.tier.map(|t| t.code()))
    .bind(entry.payment_id.map(PaymentId::into_uuid))
    .bind(entry.job_id.map(JobId::into_uuid))
    .bind(&entry.note)
    .fetch_one(&mut *conn)
    .await?;

    Ok(created_at)
}

async fn lock_job(conn: &mut PgConnection, job_id: JobId) -> BillingResult<Option<Job>> {
    let row = sqlx::query_as::<_, JobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs WHERE job_id = $1 FOR UPDATE"
    ))
    .bind(job_id.into_uuid())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(JobRow::into_job).transpose()?)
}

async fn store_job_promotion(conn: &mut PgConnection, job: &Job) -> BillingResult<()> {
    sqlx::query(
        r#"
        UPDATE jobs
        SET status = $2,
            tier = $3,
            visibility_days = $4,
            published_at = $5,
            expires_at = $6,
            updated_at = $7
        WHERE job_id = $1
        "#,
    )
    .bind(job.id.into_uuid())
    .bind(job.status.code())
    .bind(job.tier.code())
    .bind(job.visibility_days)
    .bind(job.published_at)
    .bind(job.expires_at)
    .bind(job.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn grant_purchased_credits(
    conn: &mut PgConnection,
    payment: &Payment,
    amount: i64,
    tier: JobTier,
    now: DateTime<Utc>,
) -> BillingResult<AppliedEffect> {
    lock_ledger(conn, payment.user_id).await?;
    let previous = latest_balance(conn, payment.user_id).await?;
    let entry = LedgerEntry::purchase(previous, payment, amount, tier, now)?;
    insert_ledger_entry(conn, &entry).await?;

    Ok(AppliedEffect::CreditsGranted {
        amount,
        balance: entry.balance,
    })
}

// ============================================================================
// Plans
// ============================================================================

impl PlanRepository for PgBillingRepository {
    async fn list_active_plans(&self) -> BillingResult<Vec<Plan>> {
        let rows = sqlx::query_as::<_, PlanRow>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE is_active ORDER BY price_cents, name"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PlanRow::into_plan).collect()
    }

    async fn active_plan_for_tier(&self, tier: JobTier) -> BillingResult<Option<Plan>> {
        let row = sqlx::query_as::<_, PlanRow>(&format!(
            r#"
            SELECT {PLAN_COLUMNS} FROM plans
            WHERE is_active AND tier = $1
            ORDER BY created_at, plan_id
            LIMIT 1
            "#
        ))
        .bind(tier.code())
        .fetch_optional(&self.pool)
        .await?;

        row.map(PlanRow::into_plan).transpose()
    }

    async fn find_plan(&self, plan_id: PlanId) -> BillingResult<Option<Plan>> {
        let row = sqlx::query_as::<_, PlanRow>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE plan_id = $1"
        ))
        .bind(plan_id.into_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(PlanRow::into_plan).transpose()
    }
}

// ============================================================================
// Payments
// ============================================================================

impl PaymentRepository for PgBillingRepository {
    async fn insert_pending(&self, payment: &Payment) -> BillingResult<Payment> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                payment_id, user_id, plan_id, job_id, provider, external_id,
                amount_cents, currency, status, created_at, updated_at, settled_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (external_id) DO NOTHING
            "#,
        )
        .bind(payment.id.into_uuid())
        .bind(payment.user_id.into_uuid())
        .bind(payment.plan_id.into_uuid())
        .bind(payment.job_id.map(JobId::into_uuid))
        .bind(payment.provider.code())
        .bind(&payment.external_id)
        .bind(payment.amount_cents)
        .bind(&payment.currency)
        .bind(payment.status.code())
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .bind(payment.settled_at)
        .execute(&self.pool)
        .await?;

        self.find_payment_by_external_id(&payment.external_id)
            .await?
            .ok_or_else(|| BillingError::Internal("payment vanished after insert".into()))
    }

    async fn find_payment(&self, payment_id: PaymentId) -> BillingResult<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE payment_id = $1"
        ))
        .bind(payment_id.into_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(PaymentRow::into_payment).transpose()
    }

    async fn find_payment_by_external_id(
        &self,
        external_id: &str,
    ) -> BillingResult<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE external_id = $1"
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PaymentRow::into_payment).transpose()
    }

    async fn settle_payment(
        &self,
        external_id: &str,
        now: DateTime<Utc>,
    ) -> BillingResult<SettleOutcome> {
        let mut tx = self.pool.begin().await?;

        let mut payment = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE external_id = $1 FOR UPDATE"
        ))
        .bind(external_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(BillingError::PaymentNotFound)?
        .into_payment()?;

        if payment.is_settled() {
            tx.rollback().await?;
            return Ok(SettleOutcome::AlreadySettled { payment });
        }

        let plan = sqlx::query_as::<_, PlanRow>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE plan_id = $1"
        ))
        .bind(payment.plan_id.into_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| BillingError::Internal(format!("plan {} missing", payment.plan_id)))?
        .into_plan()?;

        let effect = match payment.settlement(&plan) {
            Settlement::UpgradeJob {
                job_id,
                tier,
                visibility_days,
            } => match lock_job(&mut tx, job_id).await? {
                Some(mut job) => {
                    let upgrade = job.apply_paid_upgrade(tier, visibility_days, now);
                    store_job_promotion(&mut tx, &job).await?;
                    AppliedEffect::JobUpgraded {
                        job_id,
                        tier: upgrade.tier,
                        published: upgrade.published,
                    }
                }
                None => {
                    tracing::warn!(
                        payment_id = %payment.id,
                        job_id = %job_id,
                        "Paid job no longer exists, granting credits instead"
                    );
                    grant_purchased_credits(&mut tx, &payment, i64::from(plan.credits), tier, now)
                        .await?
                }
            },
            Settlement::GrantCredits { amount, tier } => {
                grant_purchased_credits(&mut tx, &payment, amount, tier, now).await?
            }
        };

        payment.mark_succeeded(now);
        sqlx::query(
            r#"
            UPDATE payments
            SET status = $2, settled_at = $3, updated_at = $3
            WHERE payment_id = $1
            "#,
        )
        .bind(payment.id.into_uuid())
        .bind(payment.status.code())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(SettleOutcome::Settled { payment, effect })
    }

    async fn fail_payment(
        &self,
        external_id: &str,
        now: DateTime<Utc>,
    ) -> BillingResult<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            r#"
            UPDATE payments
            SET status = 'failed', updated_at = $2
            WHERE external_id = $1 AND status = 'pending'
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(external_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PaymentRow::into_payment).transpose()
    }

    async fn record_webhook_event(&self, event: &WebhookEvent) -> BillingResult<bool> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO webhook_events (provider, event_id, event_type, payload, received_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (provider, event_id) DO NOTHING
            "#,
        )
        .bind(event.provider.code())
        .bind(&event.event_id)
        .bind(&event.event_type)
        .bind(sqlx::types::Json(&event.payload))
        .bind(event.received_at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(inserted > 0)
    }
}

// ============================================================================
// Ledger
// ============================================================================

impl LedgerRepository for PgBillingRepository {
    async fn credit_balance(&self, user_id: UserId) -> BillingResult<i64> {
        let mut conn = self.pool.acquire().await?;
        latest_balance(&mut conn, user_id).await
    }

    async fn ledger_history(&self, user_id: UserId, limit: u32) -> BillingResult<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerRow>(&format!(
            r#"
            SELECT {LEDGER_COLUMNS} FROM credit_ledger
            WHERE user_id = $1
            ORDER BY created_at DESC, ledger_seq DESC
            LIMIT $2
            "#
        ))
        .bind(user_id.into_uuid())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LedgerRow::into_entry).collect()
    }

    async fn spend_credit_on_job(
        &self,
        user_id: UserId,
        job_id: JobId,
        now: DateTime<Utc>,
    ) -> BillingResult<FeatureOutcome> {
        let mut tx = self.pool.begin().await?;

        let mut job = lock_job(&mut tx, job_id)
            .await?
            .ok_or(BillingError::JobNotFound)?;

        let is_member: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM company_members WHERE company_id = $1 AND user_id = $2)",
        )
        .bind(job.company_id.into_uuid())
        .bind(user_id.into_uuid())
        .fetch_one(&mut *tx)
        .await?;
        if !is_member {
            return Err(BillingError::NotCompanyMember);
        }

        lock_ledger(&mut tx, user_id).await?;
        let previous = latest_balance(&mut tx, user_id).await?;

        if !job.apply_credit_upgrade(now)? {
            tx.rollback().await?;
            return Ok(FeatureOutcome::AlreadyPromoted {
                job_id,
                tier: job.tier,
                balance: previous,
            });
        }

        let entry = LedgerEntry::debit_for_feature(previous, user_id, job_id, now)?;
        insert_ledger_entry(&mut tx, &entry).await?;
        store_job_promotion(&mut tx, &job).await?;

        tx.commit().await?;
        Ok(FeatureOutcome::Upgraded {
            job_id,
            balance: entry.balance,
        })
    }

    async fn adjust_credits(
        &self,
        user_id: UserId,
        amount: i64,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> BillingResult<LedgerEntry> {
        let mut tx = self.pool.begin().await?;

        lock_ledger(&mut tx, user_id).await?;
        let previous = latest_balance(&mut tx, user_id).await?;
        let mut entry = LedgerEntry::adjustment(previous, user_id, amount, note, now)?;
        entry.created_at = insert_ledger_entry(&mut tx, &entry).await?;

        tx.commit().await?;
        Ok(entry)
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(sqlx::FromRow)]
struct PlanRow {
    plan_id: Uuid,
    name: String,
    tier: String,
    visibility_days: i32,
    price_cents: i64,
    credits: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl PlanRow {
    fn into_plan(self) -> BillingResult<Plan> {
        let tier = JobTier::from_code(&self.tier)
            .ok_or_else(|| BillingError::Internal(format!("unknown plan tier: {}", self.tier)))?;

        Ok(Plan {
            id: PlanId::from_uuid(self.plan_id),
            name: self.name,
            tier,
            visibility_days: self.visibility_days,
            price_cents: self.price_cents,
            credits: self.credits,
            is_active: self.is_active,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    payment_id: Uuid,
    user_id: Uuid,
    plan_id: Uuid,
    job_id: Option<Uuid>,
    provider: String,
    external_id: String,
    amount_cents: i64,
    currency: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    settled_at: Option<DateTime<Utc>>,
}

impl PaymentRow {
    fn into_payment(self) -> BillingResult<Payment> {
        let provider = PaymentProvider::from_code(&self.provider).ok_or_else(|| {
            BillingError::Internal(format!("unknown payment provider: {}", self.provider))
        })?;
        let status = PaymentStatus::from_code(&self.status).ok_or_else(|| {
            BillingError::Internal(format!("unknown payment status: {}", self.status))
        })?;

        Ok(Payment {
            id: PaymentId::from_uuid(self.payment_id),
            user_id: UserId::from_uuid(self.user_id),
            plan_id: PlanId::from_uuid(self.plan_id),
            job_id: self.job_id.map(JobId::from_uuid),
            provider,
            external_id: self.external_id,
            amount_cents: self.amount_cents,
            currency: self.currency,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            settled_at: self.settled_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LedgerRow {
    ledger_entry_id: Uuid,
    user_id: Uuid,
    amount: i64,
    balance: i64,
    reason: String,
    tier: Option<String>,
    payment_id: Option<Uuid>,
    job_id: Option<Uuid>,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl LedgerRow {
    fn into_entry(self) -> BillingResult<LedgerEntry> {
        let reason = LedgerReason::from_code(&self.reason).ok_or_else(|| {
            BillingError::Internal(format!("unknown ledger reason: {}", self.reason))
        })?;
        let tier = match self.tier {
            Some(code) => Some(
                JobTier::from_code(&code)
                    .ok_or_else(|| BillingError::Internal(format!("unknown ledger tier: {code}")))?,
            ),
            None => None,
        };

        Ok(LedgerEntry {
            id: LedgerEntryId::from_uuid(self.ledger_entry_id),
            user_id: UserId::from_uuid(self.user_id),
            amount: self.amount,
            balance: self.balance,
            reason,
            tier,
            payment_id: self.payment_id.map(PaymentId::from_uuid),
            job_id: self.job_id.map(JobId::from_uuid),
            note: self.note,
            created_at: self.created_at,
        })
    }
}
