//! Company Use Cases

use chrono::Utc;
use kernel::id::{CompanyId, UserId};
use platform::identity::Identity;
use std::sync::Arc;

use crate::application::access::{ensure_hiring, ensure_member, ensure_owner, optional_text, required_text};
use crate::application::config::MarketplaceConfig;
use crate::domain::entities::{Company, CompanyMember};
use crate::domain::repository::CompanyRepository;
use crate::domain::value_objects::MemberRole;
use crate::error::{MarketplaceError, MarketplaceResult};

/// Input DTO for company creation
#[derive(Debug, Clone)]
pub struct CreateCompanyInput {
    pub name: String,
    pub website: Option<String>,
}

pub struct CompanyUseCase<R>
where
    R: CompanyRepository,
{
    repo: Arc<R>,
    config: Arc<MarketplaceConfig>,
}

impl<R> CompanyUseCase<R>
where
    R: CompanyRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<MarketplaceConfig>) -> Self {
        Self { repo, config }
    }

    /// Create a company; the creator becomes its owner
    pub async fn create(
        &self,
        caller: &Identity,
        input: CreateCompanyInput,
    ) -> MarketplaceResult<Company> {
        ensure_hiring(caller)?;

        let name = required_text("name", &input.name, self.config.company_name_max_len)?;
        let website = optional_text("website", input.website, 2048)?;

        let now = Utc::now();
        let company = Company::new(name, website, caller.user_id, now);
        let owner = CompanyMember::new(company.id, caller.user_id, MemberRole::Owner, now);
        self.repo.create_company(&company, &owner).await?;

        tracing::info!(
            company_id = %company.id,
            owner_id = %caller.user_id,
            "Company created"
        );

        Ok(company)
    }

    pub async fn get(&self, caller: &Identity, company_id: CompanyId) -> MarketplaceResult<Company> {
        let company = self
            .repo
            .find_company(company_id)
            .await?
            .ok_or(MarketplaceError::CompanyNotFound)?;
        ensure_member(self.repo.as_ref(), company_id, caller).await?;
        Ok(company)
    }

    pub async fn list_mine(&self, caller: &Identity) -> MarketplaceResult<Vec<Company>> {
        self.repo.list_companies_for_user(caller.user_id).await
    }

    /// Add a member or change their role (owner or admin only)
    pub async fn add_member(
        &self,
        caller: &Identity,
        company_id: CompanyId,
        user_id: UserId,
        member_role: MemberRole,
    ) -> MarketplaceResult<CompanyMember> {
        self.repo
            .find_company(company_id)
            .await?
            .ok_or(MarketplaceError::CompanyNotFound)?;
        ensure_owner(self.repo.as_ref(), company_id, caller).await?;

        let member = CompanyMember::new(company_id, user_id, member_role, Utc::now());
        self.repo.upsert_member(&member).await?;

        tracing::info!(
            company_id = %company_id,
            user_id = %user_id,
            role = member_role.code(),
            "Company member set"
        );

        Ok(member)
    }

    /// Delete a company and, through cascade, its jobs and applications
    ///
    /// Irreversible.
    pub async fn delete(&self, caller: &Identity, company_id: CompanyId) -> MarketplaceResult<()> {
        self.repo
            .find_company(company_id)
            .await?
            .ok_or(MarketplaceError::CompanyNotFound)?;
        ensure_owner(self.repo.as_ref(), company_id, caller).await?;

        if !self.repo.delete_company(company_id).await? {
            return Err(MarketplaceError::CompanyNotFound);
        }

        tracing::warn!(
            company_id = %company_id,
            deleted_by = %caller.user_id,
            "Company deleted with all jobs and applications"
        );

        Ok(())
    }
}
