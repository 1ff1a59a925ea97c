//! Expire Jobs Use Case
//!
//! Closes visibility windows: active jobs whose `expires_at` has passed move
//! to `expired` and drop back to the `normal` tier.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::domain::repository::JobRepository;
use crate::error::MarketplaceResult;

pub struct ExpireJobsUseCase<R>
where
    R: JobRepository,
{
    repo: Arc<R>,
}

impl<R> ExpireJobsUseCase<R>
where
    R: JobRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self) -> MarketplaceResult<u64> {
        self.execute_at(Utc::now()).await
    }

    pub async fn execute_at(&self, now: DateTime<Utc>) -> MarketplaceResult<u64> {
        let expired = self.repo.expire_due_jobs(now).await?;
        if expired > 0 {
            tracing::info!(expired, "Expired jobs past their visibility window");
        } else {
            tracing::debug!("No jobs due for expiry");
        }
        Ok(expired)
    }
}
