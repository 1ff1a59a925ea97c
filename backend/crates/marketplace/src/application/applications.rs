//! Application Workflow Use Case
//!
//! Talent applies and may withdraw; the hiring company moves the
//! application through review. Rejection is a status, never a delete,
//! because message threads hang off the application.

use chrono::{DateTime, Utc};
use kernel::id::{ApplicationId, JobId};
use kernel::role::UserRole;
use platform::identity::Identity;
use std::sync::Arc;

use crate::application::access::{ensure_member, optional_text};
use crate::application::config::MarketplaceConfig;
use crate::domain::entities::{Application, Job};
use crate::domain::repository::{ApplicationRepository, CompanyRepository, JobRepository};
use crate::domain::value_objects::ApplicationStatus;
use crate::error::{MarketplaceError, MarketplaceResult};

/// Input DTO for applying to a job
#[derive(Debug, Clone, Default)]
pub struct ApplyInput {
    pub resume_url: Option<String>,
    pub cover_letter: Option<String>,
}

pub struct ApplicationWorkflowUseCase<R>
where
    R: CompanyRepository + JobRepository + ApplicationRepository,
{
    repo: Arc<R>,
    config: Arc<MarketplaceConfig>,
}

impl<R> ApplicationWorkflowUseCase<R>
where
    R: CompanyRepository + JobRepository + ApplicationRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<MarketplaceConfig>) -> Self {
        Self { repo, config }
    }

    async fn load(&self, application_id: ApplicationId) -> MarketplaceResult<(Application, Job)> {
        let application = self
            .repo
            .find_application(application_id)
            .await?
            .ok_or(MarketplaceError::ApplicationNotFound)?;
        let job = self
            .repo
            .find_job(application.job_id)
            .await?
            .ok_or(MarketplaceError::JobNotFound)?;
        Ok((application, job))
    }

    pub async fn apply(
        &self,
        caller: &Identity,
        job_id: JobId,
        input: ApplyInput,
    ) -> MarketplaceResult<Application> {
        self.apply_at(caller, job_id, input, Utc::now()).await
    }

    pub async fn apply_at(
        &self,
        caller: &Identity,
        job_id: JobId,
        input: ApplyInput,
        now: DateTime<Utc>,
    ) -> MarketplaceResult<Application> {
        if caller.role != UserRole::Talent {
            return Err(MarketplaceError::RoleRequired("talent role"));
        }

        let job = self
            .repo
            .find_job(job_id)
            .await?
            .ok_or(MarketplaceError::JobNotFound)?;
        if !job.is_listed(now) {
            return Err(MarketplaceError::JobNotOpen);
        }

        let resume_url = optional_text("resumeUrl", input.resume_url, 2048)?;
        let cover_letter =
            optional_text("coverLetter", input.cover_letter, self.config.cover_letter_max_len)?;

        let application = Application::new(job_id, caller.user_id, resume_url, cover_letter, now);
        self.repo.create_application(&application).await?;

        tracing::info!(
            application_id = %application.id,
            job_id = %job_id,
            user_id = %caller.user_id,
            "Application submitted"
        );

        Ok(application)
    }

    /// Employer-side move (review, shortlist, interview, offer, reject)
    pub async fn update_status(
        &self,
        caller: &Identity,
        application_id: ApplicationId,
        next: ApplicationStatus,
    ) -> MarketplaceResult<Application> {
        let (mut application, job) = self.load(application_id).await?;
        ensure_member(self.repo.as_ref(), job.company_id, caller).await?;

        let previous = application.status;
        application.move_by_employer(next, Utc::now())?;
        if !self
            .repo
            .save_application_status(&application, previous)
            .await?
        {
            return Err(MarketplaceError::ConcurrentModification);
        }

        tracing::info!(
            application_id = %application.id,
            from = previous.code(),
            to = next.code(),
            by = %caller.user_id,
            "Application status changed"
        );

        Ok(application)
    }

    pub async fn withdraw(
        &self,
        caller: &Identity,
        application_id: ApplicationId,
    ) -> MarketplaceResult<Application> {
        let mut application = self
            .repo
            .find_application(application_id)
            .await?
            .ok_or(MarketplaceError::ApplicationNotFound)?;
        if application.user_id != caller.user_id {
            return Err(MarketplaceError::NotParticipant);
        }

        let previous = application.status;
        application.withdraw(Utc::now())?;
        if !self
            .repo
            .save_application_status(&application, previous)
            .await?
        {
            return Err(MarketplaceError::ConcurrentModification);
        }

        tracing::info!(application_id = %application.id, "Application withdrawn");
        Ok(application)
    }

    pub async fn list_for_job(
        &self,
        caller: &Identity,
        job_id: JobId,
    ) -> MarketplaceResult<Vec<Application>> {
        let job = self
            .repo
            .find_job(job_id)
            .await?
            .ok_or(MarketplaceError::JobNotFound)?;
        ensure_member(self.repo.as_ref(), job.company_id, caller).await?;
        self.repo.list_job_applications(job_id).await
    }

    pub async fn list_mine(&self, caller: &Identity) -> MarketplaceResult<Vec<Application>> {
        self.repo.list_user_applications(caller.user_id).await
    }
}
