//! In-memory Repository
//!
//! Backs the tests and local runs without a database. Shares the
//! marketplace store so settlement can change a job and a payment under
//! one critical section: billing state first, then marketplace state.

use chrono::{DateTime, Utc};
use kernel::id::{JobId, PaymentId, PlanId, UserId};
use marketplace::domain::value_objects::JobTier;
use marketplace::infra::memory::MarketplaceState;
use marketplace::MemoryMarketplaceRepository;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::entities::{
    AppliedEffect, FeatureOutcome, LedgerEntry, Payment, Plan, SettleOutcome, Settlement,
    WebhookEvent,
};
use crate::domain::repository::{LedgerRepository, PaymentRepository, PlanRepository};
use crate::domain::value_objects::PaymentProvider;
use crate::error::{BillingError, BillingResult};

#[derive(Debug, Default)]
struct BillingState {
    plans: Vec<Plan>,
    payments: HashMap<PaymentId, Payment>,
    /// Insertion order doubles as the ledger sequence
    ledger: Vec<LedgerEntry>,
    webhook_events: HashSet<(PaymentProvider, String)>,
}

impl BillingState {
    fn balance(&self, user_id: UserId) -> i64 {
        self.ledger
            .iter()
            .rev()
            .find(|e| e.user_id == user_id)
            .map_or(0, |e| e.balance)
    }

    fn payment_by_external_id(&mut self, external_id: &str) -> Option<&mut Payment> {
        self.payments
            .values_mut()
            .find(|p| p.external_id == external_id)
    }

    fn grant_purchased_credits(
        &mut self,
        payment: &Payment,
        amount: i64,
        tier: JobTier,
        now: DateTime<Utc>,
    ) -> BillingResult<AppliedEffect> {
        let previous = self.balance(payment.user_id);
        let entry = LedgerEntry::purchase(previous, payment, amount, tier, now)?;
        let balance = entry.balance;
        self.ledger.push(entry);
        Ok(AppliedEffect::CreditsGranted { amount, balance })
    }

    fn apply_settlement(
        &mut self,
        market: &mut MarketplaceState,
        payment: &Payment,
        plan: &Plan,
        now: DateTime<Utc>,
    ) -> BillingResult<AppliedEffect> {
        match payment.settlement(plan) {
            Settlement::UpgradeJob {
                job_id,
                tier,
                visibility_days,
            } => match market.jobs.get_mut(&job_id) {
                Some(job) => {
                    let upgrade = job.apply_paid_upgrade(tier, visibility_days, now);
                    Ok(AppliedEffect::JobUpgraded {
                        job_id,
                        tier: upgrade.tier,
                        published: upgrade.published,
                    })
                }
                None => self.grant_purchased_credits(payment, i64::from(plan.credits), tier, now),
            },
            Settlement::GrantCredits { amount, tier } => {
                self.grant_purchased_credits(payment, amount, tier, now)
            }
        }
    }
}

#[derive(Clone)]
pub struct MemoryBillingRepository {
    state: Arc<Mutex<BillingState>>,
    market: MemoryMarketplaceRepository,
}

impl MemoryBillingRepository {
    /// Store seeded with the default plan catalogue
    pub fn new(market: MemoryMarketplaceRepository) -> Self {
        Self::with_plans(market, Plan::default_catalogue(Utc::now()))
    }

    pub fn with_plans(market: MemoryMarketplaceRepository, plans: Vec<Plan>) -> Self {
        Self {
            state: Arc::new(Mutex::new(BillingState {
                plans,
                ..Default::default()
            })),
            market,
        }
    }

    pub fn market(&self) -> &MemoryMarketplaceRepository {
        &self.market
    }
}

impl PlanRepository for MemoryBillingRepository {
    async fn list_active_plans(&self) -> BillingResult<Vec<Plan>> {
        let state = self.state.lock().await;
        let mut plans: Vec<Plan> = state.plans.iter().filter(|p| p.is_active).cloned().collect();
        plans.sort_by(|a, b| a.price_cents.cmp(&b.price_cents).then_with(|| a.name.cmp(&b.name)));
        Ok(plans)
    }

    async fn active_plan_for_tier(&self, tier: JobTier) -> BillingResult<Option<Plan>> {
        let state = self.state.lock().await;
        Ok(state
            .plans
            .iter()
            .filter(|p| p.is_active && p.tier == tier)
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
            .cloned())
    }

    async fn find_plan(&self, plan_id: PlanId) -> BillingResult<Option<Plan>> {
        let state = self.state.lock().await;
        Ok(state.plans.iter().find(|p| p.id == plan_id).cloned())
    }
}

impl PaymentRepository for MemoryBillingRepository {
    async fn insert_pending(&self, payment: &Payment) -> BillingResult<Payment> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state.payment_by_external_id(&payment.external_id) {
            return Ok(existing.clone());
        }
        state.payments.insert(payment.id, payment.clone());
        Ok(payment.clone())
    }

    async fn find_payment(&self, payment_id: PaymentId) -> BillingResult<Option<Payment>> {
        let state = self.state.lock().await;
        Ok(state.payments.get(&payment_id).cloned())
    }

    async fn find_payment_by_external_id(
        &self,
        external_id: &str,
    ) -> BillingResult<Option<Payment>> {
        let mut state = self.state.lock().await;
        Ok(state.payment_by_external_id(external_id).cloned())
    }

    async fn settle_payment(
        &self,
        external_id: &str,
        now: DateTime<Utc>,
    ) -> BillingResult<SettleOutcome> {
        let mut state = self.state.lock().await;
        let mut market = self.market.state().lock().await;

        let mut payment = state
            .payment_by_external_id(external_id)
            .cloned()
            .ok_or(BillingError::PaymentNotFound)?;
        if payment.is_settled() {
            return Ok(SettleOutcome::AlreadySettled { payment });
        }

        let plan = state
            .plans
            .iter()
            .find(|p| p.id == payment.plan_id)
            .cloned()
            .ok_or_else(|| BillingError::Internal(format!("plan {} missing", payment.plan_id)))?;

        let effect = state.apply_settlement(&mut market, &payment, &plan, now)?;

        payment.mark_succeeded(now);
        state.payments.insert(payment.id, payment.clone());
        Ok(SettleOutcome::Settled { payment, effect })
    }

    async fn fail_payment(
        &self,
        external_id: &str,
        now: DateTime<Utc>,
    ) -> BillingResult<Option<Payment>> {
        let mut state = self.state.lock().await;
        Ok(state
            .payment_by_external_id(external_id)
            .and_then(|p| p.mark_failed(now).then(|| p.clone())))
    }

    async fn record_webhook_event(&self, event: &WebhookEvent) -> BillingResult<bool> {
        let mut state = self.state.lock().await;
        Ok(state
            .webhook_events
            .insert((event.provider, event.event_id.clone())))
    }
}

impl LedgerRepository for MemoryBillingRepository {
    async fn credit_balance(&self, user_id: UserId) -> BillingResult<i64> {
        let state = self.state.lock().await;
        Ok(state.balance(user_id))
    }

    async fn ledger_history(&self, user_id: UserId, limit: u32) -> BillingResult<Vec<LedgerEntry>> {
        let state = self.state.lock().await;
        Ok(state
            .ledger
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn spend_credit_on_job(
        &self,
        user_id: UserId,
        job_id: JobId,
        now: DateTime<Utc>,
    ) -> BillingResult<FeatureOutcome> {
        let mut state = self.state.lock().await;
        let mut market = self.market.state().lock().await;

        let job = market.jobs.get(&job_id).ok_or(BillingError::JobNotFound)?;
        if !market.is_member(job.company_id, user_id) {
            return Err(BillingError::NotCompanyMember);
        }

        let previous = state.balance(user_id);
        let mut upgraded = job.clone();
        if !upgraded.apply_credit_upgrade(now)? {
            return Ok(FeatureOutcome::AlreadyPromoted {
                job_id,
                tier: upgraded.tier,
                balance: previous,
            });
        }

        let entry = LedgerEntry::debit_for_feature(previous, user_id, job_id, now)?;
        let balance = entry.balance;
        state.ledger.push(entry);
        market.jobs.insert(job_id, upgraded);

        Ok(FeatureOutcome::Upgraded { job_id, balance })
    }

    async fn adjust_credits(
        &self,
        user_id: UserId,
        amount: i64,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> BillingResult<LedgerEntry> {
        let mut state = self.state.lock().await;
        let previous = state.balance(user_id);
        let entry = LedgerEntry::adjustment(previous, user_id, amount, note, now)?;
        state.ledger.push(entry.clone());
        Ok(entry)
    }
}
