//! Repository Traits
//!
//! Interfaces for data persistence. Implementations live in the infra layer.

use chrono::{DateTime, Utc};
use kernel::id::{ApplicationId, CompanyId, JobId, UserId};
use kernel::page::PageRequest;

use crate::domain::entities::{
    Application, Company, CompanyMember, EmployerJobSummary, Job, Message,
};
use crate::domain::value_objects::{ApplicationStatus, JobQuery, JobStatus};
use crate::error::MarketplaceResult;

/// Company repository trait
#[trait_variant::make(CompanyRepository: Send)]
pub trait LocalCompanyRepository {
    /// Insert a company together with its first member
    async fn create_company(&self, company: &Company, owner: &CompanyMember)
    -> MarketplaceResult<()>;

    async fn find_company(&self, company_id: CompanyId) -> MarketplaceResult<Option<Company>>;

    /// Companies the user is a member of, oldest first
    async fn list_companies_for_user(&self, user_id: UserId) -> MarketplaceResult<Vec<Company>>;

    async fn find_member(
        &self,
        company_id: CompanyId,
        user_id: UserId,
    ) -> MarketplaceResult<Option<CompanyMember>>;

    /// Add or re-role a member
    async fn upsert_member(&self, member: &CompanyMember) -> MarketplaceResult<()>;

    /// Delete a company; its jobs, applications and messages go with it
    async fn delete_company(&self, company_id: CompanyId) -> MarketplaceResult<bool>;
}

/// Job repository trait
#[trait_variant::make(JobRepository: Send)]
pub trait LocalJobRepository {
    async fn create_job(&self, job: &Job) -> MarketplaceResult<()>;

    async fn find_job(&self, job_id: JobId) -> MarketplaceResult<Option<Job>>;

    /// Persist a lifecycle change made on `job`
    ///
    /// Writes only the lifecycle fields (status, publish window,
    /// `updated_at`) and only while the stored status still equals
    /// `expected`, so two racing moderators cannot both win and a tier
    /// bought in the meantime is kept. Returns the stored job, or `None`
    /// when the transition lost.
    async fn save_job_transition(
        &self,
        job: &Job,
        expected: JobStatus,
    ) -> MarketplaceResult<Option<Job>>;

    /// Active, unexpired jobs in listing order
    async fn list_public_jobs(
        &self,
        query: &JobQuery,
        now: DateTime<Utc>,
    ) -> MarketplaceResult<Vec<Job>>;

    /// Jobs in one status, oldest first (moderation queue)
    async fn list_jobs_by_status(
        &self,
        status: JobStatus,
        page: &PageRequest,
    ) -> MarketplaceResult<Vec<Job>>;

    async fn list_company_jobs(&self, company_id: CompanyId) -> MarketplaceResult<Vec<Job>>;

    async fn increment_job_views(&self, job_id: JobId) -> MarketplaceResult<()>;

    /// Move every overdue active job to `expired`, returning how many moved
    async fn expire_due_jobs(&self, now: DateTime<Utc>) -> MarketplaceResult<u64>;

    async fn employer_job_summary(&self, user_id: UserId) -> MarketplaceResult<EmployerJobSummary>;
}

/// Application repository trait
#[trait_variant::make(ApplicationRepository: Send)]
pub trait LocalApplicationRepository {
    /// Insert and bump the job's apply counter in one step
    ///
    /// Fails with `DuplicateApplication` when the user already applied.
    async fn create_application(&self, application: &Application) -> MarketplaceResult<()>;

    async fn find_application(
        &self,
        application_id: ApplicationId,
    ) -> MarketplaceResult<Option<Application>>;

    /// Persist a status change, guarded by the previously read status
    async fn save_application_status(
        &self,
        application: &Application,
        expected: ApplicationStatus,
    ) -> MarketplaceResult<bool>;

    async fn list_job_applications(&self, job_id: JobId) -> MarketplaceResult<Vec<Application>>;

    async fn list_user_applications(&self, user_id: UserId)
    -> MarketplaceResult<Vec<Application>>;

    async fn application_status_counts(
        &self,
        user_id: UserId,
    ) -> MarketplaceResult<Vec<(ApplicationStatus, i64)>>;
}

/// Message repository trait
#[trait_variant::make(MessageRepository: Send)]
pub trait LocalMessageRepository {
    async fn create_message(&self, message: &Message) -> MarketplaceResult<()>;

    /// Thread in creation order
    async fn list_messages(&self, application_id: ApplicationId)
    -> MarketplaceResult<Vec<Message>>;

    /// Mark everything not sent by `reader` as read
    async fn mark_thread_read(
        &self,
        application_id: ApplicationId,
        reader: UserId,
    ) -> MarketplaceResult<u64>;
}

/// Saved job repository trait
#[trait_variant::make(SavedJobRepository: Send)]
pub trait LocalSavedJobRepository {
    /// Returns false when the job was already saved
    async fn save_job(&self, user_id: UserId, job_id: JobId, now: DateTime<Utc>)
    -> MarketplaceResult<bool>;

    async fn unsave_job(&self, user_id: UserId, job_id: JobId) -> MarketplaceResult<bool>;

    /// Saved jobs, most recently saved first
    async fn list_saved_jobs(&self, user_id: UserId) -> MarketplaceResult<Vec<Job>>;
}

/// Everything the marketplace HTTP layer needs from storage
pub trait MarketplaceStore:
    CompanyRepository
    + JobRepository
    + ApplicationRepository
    + MessageRepository
    + SavedJobRepository
    + Clone
    + Send
    + Sync
    + 'static
{
}

impl<T> MarketplaceStore for T where
    T: CompanyRepository
        + JobRepository
        + ApplicationRepository
        + MessageRepository
        + SavedJobRepository
        + Clone
        + Send
        + Sync
        + 'static
{
}
