//! Browse Jobs Use Case

use chrono::Utc;
use kernel::id::{CompanyId, JobId};
use kernel::page::PageRequest;
use platform::identity::Identity;
use std::sync::Arc;

use crate::application::access::ensure_member;
use crate::domain::entities::Job;
use crate::domain::repository::{CompanyRepository, JobRepository};
use crate::domain::value_objects::{JobQuery, JobTier};
use crate::error::{MarketplaceError, MarketplaceResult};

pub struct BrowseJobsUseCase<R>
where
    R: CompanyRepository + JobRepository,
{
    repo: Arc<R>,
}

impl<R> BrowseJobsUseCase<R>
where
    R: CompanyRepository + JobRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Public listing: active and unexpired only
    pub async fn list_public(
        &self,
        text: Option<String>,
        tier: Option<JobTier>,
        page: &PageRequest,
    ) -> MarketplaceResult<Vec<Job>> {
        let query = JobQuery {
            text,
            tier,
            limit: page.limit(),
            offset: page.offset(),
        };
        self.repo.list_public_jobs(&query, Utc::now()).await
    }

    /// Public detail view; counts a view
    ///
    /// Unlisted jobs read as not found so drafts and rejected jobs never leak.
    pub async fn view_public(&self, job_id: JobId) -> MarketplaceResult<Job> {
        let mut job = self
            .repo
            .find_job(job_id)
            .await?
            .ok_or(MarketplaceError::JobNotFound)?;
        if !job.is_listed(Utc::now()) {
            return Err(MarketplaceError::JobNotFound);
        }

        self.repo.increment_job_views(job_id).await?;
        job.view_count += 1;
        Ok(job)
    }

    /// Any job of the caller's company, whatever its status
    pub async fn view_as_member(&self, caller: &Identity, job_id: JobId) -> MarketplaceResult<Job> {
        let job = self
            .repo
            .find_job(job_id)
            .await?
            .ok_or(MarketplaceError::JobNotFound)?;
        ensure_member(self.repo.as_ref(), job.company_id, caller).await?;
        Ok(job)
    }

    pub async fn list_company_jobs(
        &self,
        caller: &Identity,
        company_id: CompanyId,
    ) -> MarketplaceResult<Vec<Job>> {
        self.repo
            .find_company(company_id)
            .await?
            .ok_or(MarketplaceError::CompanyNotFound)?;
        ensure_member(self.repo.as_ref(), company_id, caller).await?;
        self.repo.list_company_jobs(company_id).await
    }
}
