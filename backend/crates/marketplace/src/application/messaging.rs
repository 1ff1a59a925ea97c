//! Messaging Use Case
//!
//! One thread per application, readable by the applicant and by members of
//! the hiring company.

use chrono::Utc;
use kernel::id::ApplicationId;
use platform::identity::Identity;
use std::sync::Arc;

use crate::application::access::required_text;
use crate::application::config::MarketplaceConfig;
use crate::domain::entities::Message;
use crate::domain::repository::{
    ApplicationRepository, CompanyRepository, JobRepository, MessageRepository,
};
use crate::error::{MarketplaceError, MarketplaceResult};

pub struct MessagingUseCase<R>
where
    R: CompanyRepository + JobRepository + ApplicationRepository + MessageRepository,
{
    repo: Arc<R>,
    config: Arc<MarketplaceConfig>,
}

impl<R> MessagingUseCase<R>
where
    R: CompanyRepository + JobRepository + ApplicationRepository + MessageRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<MarketplaceConfig>) -> Self {
        Self { repo, config }
    }

    async fn ensure_participant(
        &self,
        caller: &Identity,
        application_id: ApplicationId,
    ) -> MarketplaceResult<()> {
        let application = self
            .repo
            .find_application(application_id)
            .await?
            .ok_or(MarketplaceError::ApplicationNotFound)?;
        if application.user_id == caller.user_id || caller.role.is_admin() {
            return Ok(());
        }

        let job = self
            .repo
            .find_job(application.job_id)
            .await?
            .ok_or(MarketplaceError::JobNotFound)?;
        match self.repo.find_member(job.company_id, caller.user_id).await? {
            Some(_) => Ok(()),
            None => Err(MarketplaceError::NotParticipant),
        }
    }

    pub async fn post(
        &self,
        caller: &Identity,
        application_id: ApplicationId,
        body: &str,
    ) -> MarketplaceResult<Message> {
        self.ensure_participant(caller, application_id).await?;
        let body = required_text("message", body, self.config.message_max_len)?;

        let message = Message::new(application_id, caller.user_id, body, Utc::now());
        self.repo.create_message(&message).await?;

        tracing::debug!(
            message_id = %message.id,
            application_id = %application_id,
            "Message posted"
        );

        Ok(message)
    }

    pub async fn thread(
        &self,
        caller: &Identity,
        application_id: ApplicationId,
    ) -> MarketplaceResult<Vec<Message>> {
        self.ensure_participant(caller, application_id).await?;
        self.repo.list_messages(application_id).await
    }

    pub async fn mark_read(
        &self,
        caller: &Identity,
        application_id: ApplicationId,
    ) -> MarketplaceResult<u64> {
        self.ensure_participant(caller, application_id).await?;
        self.repo
            .mark_thread_read(application_id, caller.user_id)
            .await
    }
}
