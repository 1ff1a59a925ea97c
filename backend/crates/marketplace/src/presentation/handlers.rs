//! HTTP Handlers

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use kernel::id::{ApplicationId, CompanyId, JobId, UserId};
use kernel::page::PageRequest;
use platform::identity::Identity;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::config::MarketplaceConfig;
use crate::application::{
    ApplicationWorkflowUseCase, ApplyInput, BrowseJobsUseCase, CompanyUseCase,
    CreateCompanyInput, DraftJobInput, MessagingUseCase, ModerateJobUseCase, ModerationDecision,
    PostJobUseCase, SavedJobsUseCase,
};
use crate::domain::repository::MarketplaceStore;
use crate::error::MarketplaceResult;
use crate::presentation::dto::{
    AddMemberRequest, ApplicationResponse, ApplyRequest, CompanyResponse, CreateCompanyRequest,
    CreateJobRequest, JobListQuery, JobResponse, MarkedReadResponse, MemberResponse,
    MessageResponse, PostMessageRequest, SavedResponse, UpdateApplicationStatusRequest,
    to_responses,
};

/// Shared state for marketplace handlers
#[derive(Clone)]
pub struct MarketplaceAppState<R>
where
    R: MarketplaceStore,
{
    pub repo: Arc<R>,
    pub config: Arc<MarketplaceConfig>,
}

// ============================================================================
// Public job board
// ============================================================================

/// GET /api/jobs
pub async fn list_jobs<R>(
    State(state): State<MarketplaceAppState<R>>,
    Query(query): Query<JobListQuery>,
) -> MarketplaceResult<Json<Vec<JobResponse>>>
where
    R: MarketplaceStore,
{
    let page = PageRequest {
        limit: query.limit,
        offset: query.offset,
    };
    let jobs = BrowseJobsUseCase::new(state.repo.clone())
        .list_public(query.q, query.tier, &page)
        .await?;
    Ok(Json(to_responses(jobs)))
}

/// GET /api/jobs/{id}
pub async fn get_job<R>(
    State(state): State<MarketplaceAppState<R>>,
    Path(job_id): Path<Uuid>,
) -> MarketplaceResult<Json<JobResponse>>
where
    R: MarketplaceStore,
{
    let job = BrowseJobsUseCase::new(state.repo.clone())
        .view_public(JobId::from_uuid(job_id))
        .await?;
    Ok(Json(job.into()))
}

// ============================================================================
// Companies
// ============================================================================

/// POST /api/companies
pub async fn create_company<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(caller): Extension<Identity>,
    Json(req): Json<CreateCompanyRequest>,
) -> MarketplaceResult<(StatusCode, Json<CompanyResponse>)>
where
    R: MarketplaceStore,
{
    let input = CreateCompanyInput {
        name: req.name,
        website: req.website,
    };
    let company = CompanyUseCase::new(state.repo.clone(), state.config.clone())
        .create(&caller, input)
        .await?;
    Ok((StatusCode::CREATED, Json(company.into())))
}

/// GET /api/companies/mine
pub async fn my_companies<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(caller): Extension<Identity>,
) -> MarketplaceResult<Json<Vec<CompanyResponse>>>
where
    R: MarketplaceStore,
{
    let companies = CompanyUseCase::new(state.repo.clone(), state.config.clone())
        .list_mine(&caller)
        .await?;
    Ok(Json(to_responses(companies)))
}

/// GET /api/companies/{id}
pub async fn get_company<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(caller): Extension<Identity>,
    Path(company_id): Path<Uuid>,
) -> MarketplaceResult<Json<CompanyResponse>>
where
    R: MarketplaceStore,
{
    let company = CompanyUseCase::new(state.repo.clone(), state.config.clone())
        .get(&caller, CompanyId::from_uuid(company_id))
        .await?;
    Ok(Json(company.into()))
}

/// DELETE /api/companies/{id}
pub async fn delete_company<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(caller): Extension<Identity>,
    Path(company_id): Path<Uuid>,
) -> MarketplaceResult<StatusCode>
where
    R: MarketplaceStore,
{
    CompanyUseCase::new(state.repo.clone(), state.config.clone())
        .delete(&caller, CompanyId::from_uuid(company_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/companies/{id}/members
pub async fn add_member<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(caller): Extension<Identity>,
    Path(company_id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> MarketplaceResult<Json<MemberResponse>>
where
    R: MarketplaceStore,
{
    let member = CompanyUseCase::new(state.repo.clone(), state.config.clone())
        .add_member(
            &caller,
            CompanyId::from_uuid(company_id),
            UserId::from_uuid(req.user_id),
            req.member_role,
        )
        .await?;
    Ok(Json(member.into()))
}

/// GET /api/companies/{id}/jobs
pub async fn company_jobs<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(caller): Extension<Identity>,
    Path(company_id): Path<Uuid>,
) -> MarketplaceResult<Json<Vec<JobResponse>>>
where
    R: MarketplaceStore,
{
    let jobs = BrowseJobsUseCase::new(state.repo.clone())
        .list_company_jobs(&caller, CompanyId::from_uuid(company_id))
        .await?;
    Ok(Json(to_responses(jobs)))
}

/// POST /api/companies/{id}/jobs
pub async fn create_job<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(caller): Extension<Identity>,
    Path(company_id): Path<Uuid>,
    Json(req): Json<CreateJobRequest>,
) -> MarketplaceResult<(StatusCode, Json<JobResponse>)>
where
    R: MarketplaceStore,
{
    let input = DraftJobInput {
        title: req.title,
        description: req.description,
        location: req.location,
        visibility_days: req.visibility_days,
    };
    let job = PostJobUseCase::new(state.repo.clone(), state.config.clone())
        .create_draft(&caller, CompanyId::from_uuid(company_id), input)
        .await?;
    Ok((StatusCode::CREATED, Json(job.into())))
}

// ============================================================================
// Jobs (members)
// ============================================================================

/// GET /api/jobs/{id}/manage
pub async fn manage_job<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(caller): Extension<Identity>,
    Path(job_id): Path<Uuid>,
) -> MarketplaceResult<Json<JobResponse>>
where
    R: MarketplaceStore,
{
    let job = BrowseJobsUseCase::new(state.repo.clone())
        .view_as_member(&caller, JobId::from_uuid(job_id))
        .await?;
    Ok(Json(job.into()))
}

/// POST /api/jobs/{id}/submit
pub async fn submit_job<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(caller): Extension<Identity>,
    Path(job_id): Path<Uuid>,
) -> MarketplaceResult<Json<JobResponse>>
where
    R: MarketplaceStore,
{
    let job = PostJobUseCase::new(state.repo.clone(), state.config.clone())
        .submit(&caller, JobId::from_uuid(job_id))
        .await?;
    Ok(Json(job.into()))
}

/// GET /api/jobs/{id}/applications
pub async fn job_applications<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(caller): Extension<Identity>,
    Path(job_id): Path<Uuid>,
) -> MarketplaceResult<Json<Vec<ApplicationResponse>>>
where
    R: MarketplaceStore,
{
    let applications = ApplicationWorkflowUseCase::new(state.repo.clone(), state.config.clone())
        .list_for_job(&caller, JobId::from_uuid(job_id))
        .await?;
    Ok(Json(to_responses(applications)))
}

// ============================================================================
// Talent
// ============================================================================

/// POST /api/jobs/{id}/apply
pub async fn apply<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(caller): Extension<Identity>,
    Path(job_id): Path<Uuid>,
    Json(req): Json<ApplyRequest>,
) -> MarketplaceResult<(StatusCode, Json<ApplicationResponse>)>
where
    R: MarketplaceStore,
{
    let input = ApplyInput {
        resume_url: req.resume_url,
        cover_letter: req.cover_letter,
    };
    let application = ApplicationWorkflowUseCase::new(state.repo.clone(), state.config.clone())
        .apply(&caller, JobId::from_uuid(job_id), input)
        .await?;
    Ok((StatusCode::CREATED, Json(application.into())))
}

/// POST /api/jobs/{id}/save
pub async fn save_job<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(caller): Extension<Identity>,
    Path(job_id): Path<Uuid>,
) -> MarketplaceResult<Json<SavedResponse>>
where
    R: MarketplaceStore,
{
    SavedJobsUseCase::new(state.repo.clone())
        .save(&caller, JobId::from_uuid(job_id))
        .await?;
    Ok(Json(SavedResponse { saved: true }))
}

/// DELETE /api/jobs/{id}/save
pub async fn unsave_job<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(caller): Extension<Identity>,
    Path(job_id): Path<Uuid>,
) -> MarketplaceResult<Json<SavedResponse>>
where
    R: MarketplaceStore,
{
    SavedJobsUseCase::new(state.repo.clone())
        .unsave(&caller, JobId::from_uuid(job_id))
        .await?;
    Ok(Json(SavedResponse { saved: false }))
}

/// GET /api/saved-jobs
pub async fn saved_jobs<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(caller): Extension<Identity>,
) -> MarketplaceResult<Json<Vec<JobResponse>>>
where
    R: MarketplaceStore,
{
    let jobs = SavedJobsUseCase::new(state.repo.clone()).list(&caller).await?;
    Ok(Json(to_responses(jobs)))
}

/// GET /api/applications/mine
pub async fn my_applications<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(caller): Extension<Identity>,
) -> MarketplaceResult<Json<Vec<ApplicationResponse>>>
where
    R: MarketplaceStore,
{
    let applications = ApplicationWorkflowUseCase::new(state.repo.clone(), state.config.clone())
        .list_mine(&caller)
        .await?;
    Ok(Json(to_responses(applications)))
}

/// POST /api/applications/{id}/withdraw
pub async fn withdraw_application<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(caller): Extension<Identity>,
    Path(application_id): Path<Uuid>,
) -> MarketplaceResult<Json<ApplicationResponse>>
where
    R: MarketplaceStore,
{
    let application = ApplicationWorkflowUseCase::new(state.repo.clone(), state.config.clone())
        .withdraw(&caller, ApplicationId::from_uuid(application_id))
        .await?;
    Ok(Json(application.into()))
}

// ============================================================================
// Application review & messages
// ============================================================================

/// POST /api/applications/{id}/status
pub async fn update_application_status<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(caller): Extension<Identity>,
    Path(application_id): Path<Uuid>,
    Json(req): Json<UpdateApplicationStatusRequest>,
) -> MarketplaceResult<Json<ApplicationResponse>>
where
    R: MarketplaceStore,
{
    let application = ApplicationWorkflowUseCase::new(state.repo.clone(), state.config.clone())
        .update_status(&caller, ApplicationId::from_uuid(application_id), req.status)
        .await?;
    Ok(Json(application.into()))
}

/// GET /api/applications/{id}/messages
pub async fn list_messages<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(caller): Extension<Identity>,
    Path(application_id): Path<Uuid>,
) -> MarketplaceResult<Json<Vec<MessageResponse>>>
where
    R: MarketplaceStore,
{
    let messages = MessagingUseCase::new(state.repo.clone(), state.config.clone())
        .thread(&caller, ApplicationId::from_uuid(application_id))
        .await?;
    Ok(Json(to_responses(messages)))
}

/// POST /api/applications/{id}/messages
pub async fn post_message<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(caller): Extension<Identity>,
    Path(application_id): Path<Uuid>,
    Json(req): Json<PostMessageRequest>,
) -> MarketplaceResult<(StatusCode, Json<MessageResponse>)>
where
    R: MarketplaceStore,
{
    let message = MessagingUseCase::new(state.repo.clone(), state.config.clone())
        .post(&caller, ApplicationId::from_uuid(application_id), &req.message)
        .await?;
    Ok((StatusCode::CREATED, Json(message.into())))
}

/// POST /api/applications/{id}/messages/read
pub async fn mark_messages_read<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(caller): Extension<Identity>,
    Path(application_id): Path<Uuid>,
) -> MarketplaceResult<Json<MarkedReadResponse>>
where
    R: MarketplaceStore,
{
    let updated = MessagingUseCase::new(state.repo.clone(), state.config.clone())
        .mark_read(&caller, ApplicationId::from_uuid(application_id))
        .await?;
    Ok(Json(MarkedReadResponse { updated }))
}

// ============================================================================
// Admin moderation
// ============================================================================

/// GET /api/admin/jobs/pending
pub async fn pending_jobs<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(caller): Extension<Identity>,
    Query(page): Query<PageRequest>,
) -> MarketplaceResult<Json<Vec<JobResponse>>>
where
    R: MarketplaceStore,
{
    let jobs = ModerateJobUseCase::new(state.repo.clone())
        .pending(&caller, &page)
        .await?;
    Ok(Json(to_responses(jobs)))
}

/// POST /api/admin/jobs/{id}/approve
pub async fn approve_job<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(caller): Extension<Identity>,
    Path(job_id): Path<Uuid>,
) -> MarketplaceResult<Json<JobResponse>>
where
    R: MarketplaceStore,
{
    let job = ModerateJobUseCase::new(state.repo.clone())
        .execute(&caller, JobId::from_uuid(job_id), ModerationDecision::Approve)
        .await?;
    Ok(Json(job.into()))
}

/// POST /api/admin/jobs/{id}/reject
pub async fn reject_job<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(caller): Extension<Identity>,
    Path(job_id): Path<Uuid>,
) -> MarketplaceResult<Json<JobResponse>>
where
    R: MarketplaceStore,
{
    let job = ModerateJobUseCase::new(state.repo.clone())
        .execute(&caller, JobId::from_uuid(job_id), ModerationDecision::Reject)
        .await?;
    Ok(Json(job.into()))
}
