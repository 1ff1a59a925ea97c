//! Access rules shared by the use cases

use kernel::id::CompanyId;
use platform::identity::Identity;

use crate::domain::entities::CompanyMember;
use crate::domain::repository::CompanyRepository;
use crate::domain::value_objects::MemberRole;
use crate::error::{MarketplaceError, MarketplaceResult};

/// Require company membership; admins pass without one
///
/// Returns the membership when there is one.
pub async fn ensure_member<R>(
    repo: &R,
    company_id: CompanyId,
    caller: &Identity,
) -> MarketplaceResult<Option<CompanyMember>>
where
    R: CompanyRepository,
{
    let member = repo.find_member(company_id, caller.user_id).await?;
    if member.is_none() && !caller.role.is_admin() {
        return Err(MarketplaceError::NotCompanyMember);
    }
    Ok(member)
}

/// Require the owner role inside the company; admins pass
pub async fn ensure_owner<R>(
    repo: &R,
    company_id: CompanyId,
    caller: &Identity,
) -> MarketplaceResult<()>
where
    R: CompanyRepository,
{
    let member = ensure_member(repo, company_id, caller).await?;
    let is_owner = member.is_some_and(|m| m.member_role == MemberRole::Owner);
    if is_owner || caller.role.is_admin() {
        Ok(())
    } else {
        Err(MarketplaceError::RoleRequired("company owner"))
    }
}

pub fn ensure_admin(caller: &Identity) -> MarketplaceResult<()> {
    if caller.role.is_admin() {
        Ok(())
    } else {
        Err(MarketplaceError::RoleRequired("admin role"))
    }
}

pub fn ensure_hiring(caller: &Identity) -> MarketplaceResult<()> {
    if caller.role.is_hiring() {
        Ok(())
    } else {
        Err(MarketplaceError::RoleRequired("employer or recruiter role"))
    }
}

/// Trimmed required text with a length cap
pub fn required_text(field: &str, value: &str, max_len: usize) -> MarketplaceResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(MarketplaceError::Validation(format!("{field} is required")));
    }
    if value.chars().count() > max_len {
        return Err(MarketplaceError::Validation(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(value.to_string())
}

/// Trimmed optional text; blank becomes `None`
pub fn optional_text(
    field: &str,
    value: Option<String>,
    max_len: usize,
) -> MarketplaceResult<Option<String>> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => required_text(field, v, max_len).map(Some),
    }
}
