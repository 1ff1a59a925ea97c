//! Saved Jobs Use Case

use chrono::Utc;
use kernel::id::JobId;
use platform::identity::Identity;
use std::sync::Arc;

use crate::domain::entities::Job;
use crate::domain::repository::{JobRepository, SavedJobRepository};
use crate::error::{MarketplaceError, MarketplaceResult};

pub struct SavedJobsUseCase<R>
where
    R: JobRepository + SavedJobRepository,
{
    repo: Arc<R>,
}

impl<R> SavedJobsUseCase<R>
where
    R: JobRepository + SavedJobRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Bookmark a listed job; saving twice is a no-op
    pub async fn save(&self, caller: &Identity, job_id: JobId) -> MarketplaceResult<bool> {
        let now = Utc::now();
        let job = self
            .repo
            .find_job(job_id)
            .await?
            .ok_or(MarketplaceError::JobNotFound)?;
        if !job.is_listed(now) {
            return Err(MarketplaceError::JobNotFound);
        }
        self.repo.save_job(caller.user_id, job_id, now).await
    }

    pub async fn unsave(&self, caller: &Identity, job_id: JobId) -> MarketplaceResult<bool> {
        self.repo.unsave_job(caller.user_id, job_id).await
    }

    pub async fn list(&self, caller: &Identity) -> MarketplaceResult<Vec<Job>> {
        self.repo.list_saved_jobs(caller.user_id).await
    }
}
