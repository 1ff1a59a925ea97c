//! Post Job Use Case
//!
//! Employers draft jobs and submit them to the moderation queue.

use chrono::Utc;
use kernel::id::{CompanyId, JobId};
use platform::identity::Identity;
use std::sync::Arc;

use crate::application::access::{ensure_member, optional_text, required_text};
use crate::application::config::MarketplaceConfig;
use crate::domain::entities::Job;
use crate::domain::repository::{CompanyRepository, JobRepository};
use crate::domain::value_objects::JobStatus;
use crate::error::{MarketplaceError, MarketplaceResult};

/// Input DTO for a new draft
#[derive(Debug, Clone)]
pub struct DraftJobInput {
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub visibility_days: Option<i32>,
}

pub struct PostJobUseCase<R>
where
    R: CompanyRepository + JobRepository,
{
    repo: Arc<R>,
    config: Arc<MarketplaceConfig>,
}

impl<R> PostJobUseCase<R>
where
    R: CompanyRepository + JobRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<MarketplaceConfig>) -> Self {
        Self { repo, config }
    }

    pub async fn create_draft(
        &self,
        caller: &Identity,
        company_id: CompanyId,
        input: DraftJobInput,
    ) -> MarketplaceResult<Job> {
        self.repo
            .find_company(company_id)
            .await?
            .ok_or(MarketplaceError::CompanyNotFound)?;
        ensure_member(self.repo.as_ref(), company_id, caller).await?;

        let title = required_text("title", &input.title, self.config.title_max_len)?;
        let description =
            required_text("description", &input.description, self.config.description_max_len)?;
        let location = optional_text("location", input.location, 200)?;

        let visibility_days = input
            .visibility_days
            .unwrap_or(self.config.default_visibility_days);
        if !(1..=self.config.max_visibility_days).contains(&visibility_days) {
            return Err(MarketplaceError::Validation(format!(
                "visibilityDays must be between 1 and {}",
                self.config.max_visibility_days
            )));
        }

        let job = Job::draft(
            company_id,
            caller.user_id,
            title,
            description,
            location,
            visibility_days,
            Utc::now(),
        );
        self.repo.create_job(&job).await?;

        tracing::info!(job_id = %job.id, company_id = %company_id, "Job drafted");
        Ok(job)
    }

    /// draft → pending
    pub async fn submit(&self, caller: &Identity, job_id: JobId) -> MarketplaceResult<Job> {
        let mut job = self
            .repo
            .find_job(job_id)
            .await?
            .ok_or(MarketplaceError::JobNotFound)?;
        ensure_member(self.repo.as_ref(), job.company_id, caller).await?;

        job.submit(Utc::now())?;
        let job = self
            .repo
            .save_job_transition(&job, JobStatus::Draft)
            .await?
            .ok_or(MarketplaceError::ConcurrentModification)?;

        tracing::info!(job_id = %job.id, "Job submitted for review");
        Ok(job)
    }
}
