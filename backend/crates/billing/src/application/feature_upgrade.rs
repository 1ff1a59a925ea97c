//! Credit Feature Upgrade Use Case
//!
//! Spend one credit to make a job `featured`.

use chrono::{DateTime, Utc};
use kernel::id::JobId;
use marketplace::application::access::ensure_hiring;
use platform::identity::Identity;
use std::sync::Arc;

use crate::domain::entities::FeatureOutcome;
use crate::domain::repository::LedgerRepository;
use crate::error::BillingResult;

pub struct FeatureUpgradeUseCase<R>
where
    R: LedgerRepository,
{
    repo: Arc<R>,
}

impl<R> FeatureUpgradeUseCase<R>
where
    R: LedgerRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, caller: &Identity, job_id: JobId) -> BillingResult<FeatureOutcome> {
        self.execute_at(caller, job_id, Utc::now()).await
    }

    pub async fn execute_at(
        &self,
        caller: &Identity,
        job_id: JobId,
        now: DateTime<Utc>,
    ) -> BillingResult<FeatureOutcome> {
        ensure_hiring(caller)?;

        let outcome = self
            .repo
            .spend_credit_on_job(caller.user_id, job_id, now)
            .await?;

        match outcome {
            FeatureOutcome::Upgraded { balance, .. } => {
                tracing::info!(
                    job_id = %job_id,
                    user_id = %caller.user_id,
                    balance,
                    "Job featured with a credit"
                );
            }
            FeatureOutcome::AlreadyPromoted { tier, .. } => {
                tracing::debug!(job_id = %job_id, tier = tier.code(), "Job already promoted");
            }
        }

        Ok(outcome)
    }
}
