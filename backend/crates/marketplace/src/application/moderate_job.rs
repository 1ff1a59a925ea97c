//! Moderate Job Use Case
//!
//! pending → active (approve) or rejected (reject, terminal). Admin only.

use chrono::{DateTime, Utc};
use kernel::id::JobId;
use kernel::page::PageRequest;
use platform::identity::Identity;
use std::sync::Arc;

use crate::application::access::ensure_admin;
use crate::domain::entities::Job;
use crate::domain::repository::JobRepository;
use crate::domain::value_objects::JobStatus;
use crate::error::{MarketplaceError, MarketplaceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationDecision {
    Approve,
    Reject,
}

impl ModerationDecision {
    pub const fn code(&self) -> &'static str {
        match self {
            ModerationDecision::Approve => "approve",
            ModerationDecision::Reject => "reject",
        }
    }
}

pub struct ModerateJobUseCase<R>
where
    R: JobRepository,
{
    repo: Arc<R>,
}

impl<R> ModerateJobUseCase<R>
where
    R: JobRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn execute(
        &self,
        caller: &Identity,
        job_id: JobId,
        decision: ModerationDecision,
    ) -> MarketplaceResult<Job> {
        self.execute_at(caller, job_id, decision, Utc::now()).await
    }

    /// Same as [`execute`](Self::execute) with an explicit clock
    pub async fn execute_at(
        &self,
        caller: &Identity,
        job_id: JobId,
        decision: ModerationDecision,
        now: DateTime<Utc>,
    ) -> MarketplaceResult<Job> {
        ensure_admin(caller)?;

        let mut job = self
            .repo
            .find_job(job_id)
            .await?
            .ok_or(MarketplaceError::JobNotFound)?;

        match decision {
            ModerationDecision::Approve => job.approve(now)?,
            ModerationDecision::Reject => job.reject(now)?,
        }

        let job = self
            .repo
            .save_job_transition(&job, JobStatus::Pending)
            .await?
            .ok_or(MarketplaceError::ConcurrentModification)?;

        tracing::info!(
            job_id = %job.id,
            admin_id = %caller.user_id,
            decision = decision.code(),
            status = job.status.code(),
            "Job moderated"
        );

        Ok(job)
    }

    /// Moderation queue, oldest first
    pub async fn pending(&self, caller: &Identity, page: &PageRequest) -> MarketplaceResult<Vec<Job>> {
        ensure_admin(caller)?;
        self.repo.list_jobs_by_status(JobStatus::Pending, page).await
    }
}
