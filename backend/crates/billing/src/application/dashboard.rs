//! Dashboard Stats Use Case

use marketplace::domain::entities::EmployerJobSummary;
use marketplace::domain::repository::{ApplicationRepository, JobRepository};
use marketplace::domain::value_objects::ApplicationStatus;
use platform::identity::Identity;
use std::sync::Arc;

use crate::domain::repository::LedgerRepository;
use crate::error::BillingResult;

#[derive(Debug, Clone)]
pub struct DashboardStats {
    pub credits_balance: i64,
    /// Jobs of every company the caller belongs to
    pub jobs: EmployerJobSummary,
    /// The caller's own applications by status
    pub applications: Vec<(ApplicationStatus, i64)>,
}

pub struct DashboardUseCase<R, M>
where
    R: LedgerRepository,
    M: JobRepository + ApplicationRepository,
{
    repo: Arc<R>,
    market: Arc<M>,
}

impl<R, M> DashboardUseCase<R, M>
where
    R: LedgerRepository,
    M: JobRepository + ApplicationRepository,
{
    pub fn new(repo: Arc<R>, market: Arc<M>) -> Self {
        Self { repo, market }
    }

    pub async fn stats(&self, caller: &Identity) -> BillingResult<DashboardStats> {
        let credits_balance = self.repo.credit_balance(caller.user_id).await?;
        let jobs = self.market.employer_job_summary(caller.user_id).await?;
        let applications = self
            .market
            .application_status_counts(caller.user_id)
            .await?;

        Ok(DashboardStats {
            credits_balance,
            jobs,
            applications,
        })
    }
}
