//! In-memory Repository
//!
//! Every operation runs under one async mutex, so each call is as atomic as
//! a database transaction. Used by tests and local tooling.

use chrono::{DateTime, Utc};
use kernel::id::{ApplicationId, CompanyId, JobId, UserId};
use kernel::page::PageRequest;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::entities::{
    Application, Company, CompanyMember, EmployerJobSummary, Job, Message, SavedJob,
};
use crate::domain::repository::{
    ApplicationRepository, CompanyRepository, JobRepository, MessageRepository,
    SavedJobRepository,
};
use crate::domain::services::listing_order;
use crate::domain::value_objects::{ApplicationStatus, JobQuery, JobStatus};
use crate::error::{MarketplaceError, MarketplaceResult};

/// Tables of the in-memory store
///
/// Public so a store for another context can take the same lock and update
/// jobs inside its own atomic section.
#[derive(Debug, Default)]
pub struct MarketplaceState {
    pub companies: HashMap<CompanyId, Company>,
    pub members: Vec<CompanyMember>,
    pub jobs: HashMap<JobId, Job>,
    pub applications: HashMap<ApplicationId, Application>,
    pub messages: Vec<Message>,
    pub saved: Vec<SavedJob>,
}

impl MarketplaceState {
    pub fn is_member(&self, company_id: CompanyId, user_id: UserId) -> bool {
        self.members
            .iter()
            .any(|m| m.company_id == company_id && m.user_id == user_id)
    }

    /// Mirror of the foreign-key cascade from `companies`
    fn delete_company_cascade(&mut self, company_id: CompanyId) -> bool {
        if self.companies.remove(&company_id).is_none() {
            return false;
        }

        self.members.retain(|m| m.company_id != company_id);

        let job_ids: Vec<JobId> = self
            .jobs
            .values()
            .filter(|j| j.company_id == company_id)
            .map(|j| j.id)
            .collect();
        self.jobs.retain(|_, j| j.company_id != company_id);
        self.saved.retain(|s| !job_ids.contains(&s.job_id));

        let application_ids: Vec<ApplicationId> = self
            .applications
            .values()
            .filter(|a| job_ids.contains(&a.job_id))
            .map(|a| a.id)
            .collect();
        self.applications
            .retain(|id, _| !application_ids.contains(id));
        self.messages
            .retain(|m| !application_ids.contains(&m.application_id));

        true
    }
}

#[derive(Clone, Default)]
pub struct MemoryMarketplaceRepository {
    state: Arc<Mutex<MarketplaceState>>,
}

impl MemoryMarketplaceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &Arc<Mutex<MarketplaceState>> {
        &self.state
    }
}

fn page<T>(items: Vec<T>, limit: u32, offset: u32) -> Vec<T> {
    items
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect()
}

fn matches_query(job: &Job, query: &JobQuery) -> bool {
    if query.tier.is_some_and(|tier| job.tier != tier) {
        return false;
    }
    match query.search_text() {
        None => true,
        Some(text) => {
            job.title.to_lowercase().contains(&text)
                || job.description.to_lowercase().contains(&text)
                || job
                    .location
                    .as_deref()
                    .is_some_and(|l| l.to_lowercase().contains(&text))
        }
    }
}

impl CompanyRepository for MemoryMarketplaceRepository {
    async fn create_company(
        &self,
        company: &Company,
        owner: &CompanyMember,
    ) -> MarketplaceResult<()> {
        let mut state = self.state.lock().await;
        state.companies.insert(company.id, company.clone());
        state.members.push(owner.clone());
        Ok(())
    }

    async fn find_company(&self, company_id: CompanyId) -> MarketplaceResult<Option<Company>> {
        Ok(self.state.lock().await.companies.get(&company_id).cloned())
    }

    async fn list_companies_for_user(&self, user_id: UserId) -> MarketplaceResult<Vec<Company>> {
        let state = self.state.lock().await;
        let mut companies: Vec<Company> = state
            .members
            .iter()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| state.companies.get(&m.company_id).cloned())
            .collect();
        companies.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(companies)
    }

    async fn find_member(
        &self,
        company_id: CompanyId,
        user_id: UserId,
    ) -> MarketplaceResult<Option<CompanyMember>> {
        let state = self.state.lock().await;
        Ok(state
            .members
            .iter()
            .find(|m| m.company_id == company_id && m.user_id == user_id)
            .cloned())
    }

    async fn upsert_member(&self, member: &CompanyMember) -> MarketplaceResult<()> {
        let mut state = self.state.lock().await;
        if !state.companies.contains_key(&member.company_id) {
            return Err(MarketplaceError::CompanyNotFound);
        }
        match state
            .members
            .iter_mut()
            .find(|m| m.company_id == member.company_id && m.user_id == member.user_id)
        {
            Some(existing) => existing.member_role = member.member_role,
            None => state.members.push(member.clone()),
        }
        Ok(())
    }

    async fn delete_company(&self, company_id: CompanyId) -> MarketplaceResult<bool> {
        Ok(self.state.lock().await.delete_company_cascade(company_id))
    }
}

impl JobRepository for MemoryMarketplaceRepository {
    async fn create_job(&self, job: &Job) -> MarketplaceResult<()> {
        let mut state = self.state.lock().await;
        if !state.companies.contains_key(&job.company_id) {
            return Err(MarketplaceError::CompanyNotFound);
        }
        state.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn find_job(&self, job_id: JobId) -> MarketplaceResult<Option<Job>> {
        Ok(self.state.lock().await.jobs.get(&job_id).cloned())
    }

    async fn save_job_transition(
        &self,
        job: &Job,
        expected: JobStatus,
    ) -> MarketplaceResult<Option<Job>> {
        let mut state = self.state.lock().await;
        match state.jobs.get_mut(&job.id) {
            Some(stored) if stored.status == expected => {
                stored.status = job.status;
                stored.published_at = job.published_at;
                stored.expires_at = job.expires_at;
                stored.updated_at = job.updated_at;
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn list_public_jobs(
        &self,
        query: &JobQuery,
        now: DateTime<Utc>,
    ) -> MarketplaceResult<Vec<Job>> {
        let state = self.state.lock().await;
        let mut jobs: Vec<Job> = state
            .jobs
            .values()
            .filter(|j| j.is_listed(now) && matches_query(j, query))
            .cloned()
            .collect();
        jobs.sort_by(listing_order);
        Ok(page(jobs, query.limit, query.offset))
    }

    async fn list_jobs_by_status(
        &self,
        status: JobStatus,
        page_request: &PageRequest,
    ) -> MarketplaceResult<Vec<Job>> {
        let state = self.state.lock().await;
        let mut jobs: Vec<Job> = state
            .jobs
            .values()
            .filter(|j| j.status == status)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then(a.id.cmp(&b.id)));
        Ok(page(jobs, page_request.limit(), page_request.offset()))
    }

    async fn list_company_jobs(&self, company_id: CompanyId) -> MarketplaceResult<Vec<Job>> {
        let state = self.state.lock().await;
        let mut jobs: Vec<Job> = state
            .jobs
            .values()
            .filter(|j| j.company_id == company_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(jobs)
    }

    async fn increment_job_views(&self, job_id: JobId) -> MarketplaceResult<()> {
        if let Some(job) = self.state.lock().await.jobs.get_mut(&job_id) {
            job.view_count += 1;
        }
        Ok(())
    }

    async fn expire_due_jobs(&self, now: DateTime<Utc>) -> MarketplaceResult<u64> {
        let mut state = self.state.lock().await;
        let expired = state
            .jobs
            .values_mut()
            .map(|job| job.expire_if_due(now))
            .filter(|moved| *moved)
            .count();
        Ok(expired as u64)
    }

    async fn employer_job_summary(&self, user_id: UserId) -> MarketplaceResult<EmployerJobSummary> {
        let state = self.state.lock().await;
        let mut summary = EmployerJobSummary::default();

        for job in state
            .jobs
            .values()
            .filter(|j| state.is_member(j.company_id, user_id))
        {
            match summary.by_status.iter_mut().find(|(s, _)| *s == job.status) {
                Some((_, n)) => *n += 1,
                None => summary.by_status.push((job.status, 1)),
            }
            if job.tier.is_promoted() {
                summary.promoted += 1;
            }
            summary.total_views += job.view_count;
            summary.total_applications += job.apply_count;
        }
        Ok(summary)
    }
}

impl ApplicationRepository for MemoryMarketplaceRepository {
    async fn create_application(&self, application: &Application) -> MarketplaceResult<()> {
        let mut state = self.state.lock().await;
        let duplicate = state
            .applications
            .values()
            .any(|a| a.job_id == application.job_id && a.user_id == application.user_id);
        if duplicate {
            return Err(MarketplaceError::DuplicateApplication);
        }

        let job = state
            .jobs
            .get_mut(&application.job_id)
            .ok_or(MarketplaceError::JobNotFound)?;
        job.apply_count += 1;
        state.applications.insert(application.id, application.clone());
        Ok(())
    }

    async fn find_application(
        &self,
        application_id: ApplicationId,
    ) -> MarketplaceResult<Option<Application>> {
        Ok(self
            .state
            .lock()
            .await
            .applications
            .get(&application_id)
            .cloned())
    }

    async fn save_application_status(
        &self,
        application: &Application,
        expected: ApplicationStatus,
    ) -> MarketplaceResult<bool> {
        let mut state = self.state.lock().await;
        match state.applications.get_mut(&application.id) {
            Some(stored) if stored.status == expected => {
                stored.status = application.status;
                stored.updated_at = application.updated_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_job_applications(&self, job_id: JobId) -> MarketplaceResult<Vec<Application>> {
        let state = self.state.lock().await;
        let mut applications: Vec<Application> = state
            .applications
            .values()
            .filter(|a| a.job_id == job_id)
            .cloned()
            .collect();
        applications.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(applications)
    }

    async fn list_user_applications(
        &self,
        user_id: UserId,
    ) -> MarketplaceResult<Vec<Application>> {
        let state = self.state.lock().await;
        let mut applications: Vec<Application> = state
            .applications
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        applications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(applications)
    }

    async fn application_status_counts(
        &self,
        user_id: UserId,
    ) -> MarketplaceResult<Vec<(ApplicationStatus, i64)>> {
        let state = self.state.lock().await;
        let mut counts: Vec<(ApplicationStatus, i64)> = Vec::new();
        for application in state.applications.values().filter(|a| a.user_id == user_id) {
            match counts.iter_mut().find(|(s, _)| *s == application.status) {
                Some((_, n)) => *n += 1,
                None => counts.push((application.status, 1)),
            }
        }
        Ok(counts)
    }
}

impl MessageRepository for MemoryMarketplaceRepository {
    async fn create_message(&self, message: &Message) -> MarketplaceResult<()> {
        let mut state = self.state.lock().await;
        if !state.applications.contains_key(&message.application_id) {
            return Err(MarketplaceError::ApplicationNotFound);
        }
        state.messages.push(message.clone());
        Ok(())
    }

    async fn list_messages(
        &self,
        application_id: ApplicationId,
    ) -> MarketplaceResult<Vec<Message>> {
        let state = self.state.lock().await;
        // insertion order breaks created_at ties
        let mut messages: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| m.application_id == application_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    async fn mark_thread_read(
        &self,
        application_id: ApplicationId,
        reader: UserId,
    ) -> MarketplaceResult<u64> {
        let mut state = self.state.lock().await;
        let mut updated = 0;
        for message in state
            .messages
            .iter_mut()
            .filter(|m| m.application_id == application_id && m.sender_id != reader && !m.is_read)
        {
            message.is_read = true;
            updated += 1;
        }
        Ok(updated)
    }
}

impl SavedJobRepository for MemoryMarketplaceRepository {
    async fn save_job(
        &self,
        user_id: UserId,
        job_id: JobId,
        now: DateTime<Utc>,
    ) -> MarketplaceResult<bool> {
        let mut state = self.state.lock().await;
        if state
            .saved
            .iter()
            .any(|s| s.user_id == user_id && s.job_id == job_id)
        {
            return Ok(false);
        }
        state.saved.push(SavedJob {
            user_id,
            job_id,
            created_at: now,
        });
        Ok(true)
    }

    async fn unsave_job(&self, user_id: UserId, job_id: JobId) -> MarketplaceResult<bool> {
        let mut state = self.state.lock().await;
        let before = state.saved.len();
        state
            .saved
            .retain(|s| !(s.user_id == user_id && s.job_id == job_id));
        Ok(state.saved.len() < before)
    }

    async fn list_saved_jobs(&self, user_id: UserId) -> MarketplaceResult<Vec<Job>> {
        let state = self.state.lock().await;
        let mut saved: Vec<&SavedJob> = state.saved.iter().filter(|s| s.user_id == user_id).collect();
        saved.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(saved
            .into_iter()
            .filter_map(|s| state.jobs.get(&s.job_id).cloned())
            .collect())
    }
}
