//! Data Transfer Objects

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::{Application, Company, CompanyMember, Job, Message};
use crate::domain::value_objects::{ApplicationStatus, JobStatus, JobTier, MemberRole};

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompanyRequest {
    pub name: String,
    #[serde(default)]
    pub website: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: Uuid,
    #[serde(default = "default_member_role")]
    pub member_role: MemberRole,
}

fn default_member_role() -> MemberRole {
    MemberRole::Recruiter
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub visibility_days: Option<i32>,
}

/// Query string of the public listing
#[derive(Debug, Default, Deserialize)]
pub struct JobListQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub tier: Option<JobTier>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    #[serde(default)]
    pub resume_url: Option<String>,
    #[serde(default)]
    pub cover_letter: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateApplicationStatusRequest {
    pub status: ApplicationStatus,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub message: String,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyResponse {
    pub id: Uuid,
    pub name: String,
    pub website: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<Company> for CompanyResponse {
    fn from(company: Company) -> Self {
        Self {
            id: company.id.into_uuid(),
            name: company.name,
            website: company.website,
            created_by: company.created_by.into_uuid(),
            created_at: company.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    pub company_id: Uuid,
    pub user_id: Uuid,
    pub member_role: MemberRole,
}

impl From<CompanyMember> for MemberResponse {
    fn from(member: CompanyMember) -> Self {
        Self {
            company_id: member.company_id.into_uuid(),
            user_id: member.user_id.into_uuid(),
            member_role: member.member_role,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    pub id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub tier: JobTier,
    pub status: JobStatus,
    pub visibility_days: i32,
    pub published_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub view_count: i64,
    pub apply_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id.into_uuid(),
            company_id: job.company_id.into_uuid(),
            title: job.title,
            description: job.description,
            location: job.location,
            tier: job.tier,
            status: job.status,
            visibility_days: job.visibility_days,
            published_at: job.published_at,
            expires_at: job.expires_at,
            view_count: job.view_count,
            apply_count: job.apply_count,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationResponse {
    pub id: Uuid,
    pub job_id: Uuid,
    pub user_id: Uuid,
    pub status: ApplicationStatus,
    pub resume_url: Option<String>,
    pub cover_letter: Option<String>,
    pub score: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Application> for ApplicationResponse {
    fn from(application: Application) -> Self {
        Self {
            id: application.id.into_uuid(),
            job_id: application.job_id.into_uuid(),
            user_id: application.user_id.into_uuid(),
            status: application.status,
            resume_url: application.resume_url,
            cover_letter: application.cover_letter,
            score: application.score,
            created_at: application.created_at,
            updated_at: application.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: Uuid,
    pub application_id: Uuid,
    pub sender_id: Uuid,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            id: message.id.into_uuid(),
            application_id: message.application_id.into_uuid(),
            sender_id: message.sender_id.into_uuid(),
            message: message.body,
            is_read: message.is_read,
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MarkedReadResponse {
    pub updated: u64,
}

#[derive(Debug, Serialize)]
pub struct SavedResponse {
    pub saved: bool,
}

/// Convert a list of entities into response DTOs
pub fn to_responses<T, R>(items: Vec<T>) -> Vec<R>
where
    R: From<T>,
{
    items.into_iter().map(R::from).collect()
}
