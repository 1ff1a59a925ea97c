//! Checkout Use Case
//!
//! Opens a provider payment for a plan and records it as `pending`.
//! With a job the plan upgrades that job; without one it buys credits.

use chrono::Utc;
use kernel::id::{JobId, PaymentId};
use marketplace::application::access::{ensure_hiring, ensure_member};
use marketplace::domain::repository::{CompanyRepository, JobRepository};
use marketplace::domain::value_objects::{JobStatus, JobTier};
use marketplace::MarketplaceError;
use platform::identity::Identity;
use std::sync::Arc;

use crate::application::config::BillingConfig;
use crate::domain::entities::{Payment, Plan};
use crate::domain::gateway::{CheckoutRequest, CheckoutSession, PaymentGateway};
use crate::domain::repository::{PaymentRepository, PlanRepository};
use crate::error::{BillingError, BillingResult};

#[derive(Debug, Clone, Copy)]
pub struct CheckoutInput {
    pub tier: JobTier,
    pub job_id: Option<JobId>,
}

#[derive(Debug, Clone)]
pub struct CheckoutOutput {
    pub payment: Payment,
    pub plan: Plan,
    pub session: CheckoutSession,
}

pub struct CheckoutUseCase<R, M, G>
where
    R: PlanRepository + PaymentRepository,
    M: CompanyRepository + JobRepository,
    G: PaymentGateway,
{
    repo: Arc<R>,
    market: Arc<M>,
    gateway: Arc<G>,
    config: Arc<BillingConfig>,
}

impl<R, M, G> CheckoutUseCase<R, M, G>
where
    R: PlanRepository + PaymentRepository,
    M: CompanyRepository + JobRepository,
    G: PaymentGateway,
{
    pub fn new(repo: Arc<R>, market: Arc<M>, gateway: Arc<G>, config: Arc<BillingConfig>) -> Self {
        Self {
            repo,
            market,
            gateway,
            config,
        }
    }

    pub async fn execute(
        &self,
        caller: &Identity,
        input: CheckoutInput,
    ) -> BillingResult<CheckoutOutput> {
        ensure_hiring(caller)?;

        if !input.tier.is_promoted() {
            return Err(BillingError::Validation(
                "tier must be featured or premium".into(),
            ));
        }

        let plan = self
            .repo
            .active_plan_for_tier(input.tier)
            .await?
            .ok_or_else(|| BillingError::PlanNotFound(input.tier.code().to_string()))?;

        let description = match input.job_id {
            Some(job_id) => {
                self.check_job(caller, job_id, &plan).await?;
                format!("{} listing for job {}", plan.name, job_id)
            }
            None => format!("{} credits x{}", plan.name, plan.credits),
        };

        let payment_id = PaymentId::new();
        let request = CheckoutRequest {
            payment_id,
            user_id: caller.user_id,
            plan_id: plan.id,
            job_id: input.job_id,
            tier: plan.tier,
            amount_cents: plan.price_cents,
            currency: self.config.currency.clone(),
            description,
        };

        let session = self.gateway.create_checkout(&request).await?;

        let payment = Payment::pending(
            payment_id,
            caller.user_id,
            &plan,
            input.job_id,
            self.gateway.provider(),
            session.external_id.clone(),
            self.config.currency.clone(),
            Utc::now(),
        );
        let stored = self.repo.insert_pending(&payment).await?;
        if stored.user_id != caller.user_id {
            return Err(BillingError::PaymentMismatch);
        }

        tracing::info!(
            payment_id = %stored.id,
            user_id = %caller.user_id,
            provider = stored.provider.code(),
            tier = plan.tier.code(),
            job_id = ?input.job_id,
            amount_cents = stored.amount_cents,
            "Checkout created"
        );

        Ok(CheckoutOutput {
            payment: stored,
            plan,
            session,
        })
    }

    async fn check_job(&self, caller: &Identity, job_id: JobId, plan: &Plan) -> BillingResult<()> {
        let job = self
            .market
            .find_job(job_id)
            .await?
            .ok_or(BillingError::JobNotFound)?;

        ensure_member(self.market.as_ref(), job.company_id, caller).await?;

        if job.status == JobStatus::Rejected {
            return Err(MarketplaceError::InvalidTransition {
                from: job.status.code(),
                action: "promote",
            }
            .into());
        }
        if job.tier >= plan.tier {
            return Err(BillingError::TierNotUpgradable(job.tier.code()));
        }
        Ok(())
    }
}
