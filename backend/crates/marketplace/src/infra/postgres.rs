//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use kernel::id::{ApplicationId, CompanyId, JobId, UserId};
use kernel::page::PageRequest;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::{
    Application, Company, CompanyMember, EmployerJobSummary, Job, Message,
};
use crate::domain::repository::{
    ApplicationRepository, CompanyRepository, JobRepository, MessageRepository,
    SavedJobRepository,
};
use crate::domain::value_objects::{ApplicationStatus, JobQuery, JobStatus, JobTier, MemberRole};
use crate::error::{MarketplaceError, MarketplaceResult};

/// Column list matching [`JobRow`]
///
/// Public so other contexts can lock and map job rows inside their own
/// transactions.
pub const JOB_COLUMNS: &str = "job_id, company_id, title, description, location, tier, status, \
     visibility_days, published_at, expires_at, view_count, apply_count, created_by, \
     created_at, updated_at";

const APPLICATION_COLUMNS: &str = "application_id, job_id, user_id, status, resume_url, \
     cover_letter, score, created_at, updated_at";

/// PostgreSQL-backed repository
#[derive(Clone)]
pub struct PgMarketplaceRepository {
    pool: PgPool,
}

impl PgMarketplaceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Escape LIKE wildcards and wrap for a substring match
fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

// ============================================================================
// Companies
// ============================================================================

impl CompanyRepository for PgMarketplaceRepository {
    async fn create_company(
        &self,
        company: &Company,
        owner: &CompanyMember,
    ) -> MarketplaceResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO companies (company_id, name, website, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(company.id.into_uuid())
        .bind(&company.name)
        .bind(&company.website)
        .bind(company.created_by.into_uuid())
        .bind(company.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO company_members (company_id, user_id, member_role, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(owner.company_id.into_uuid())
        .bind(owner.user_id.into_uuid())
        .bind(owner.member_role.code())
        .bind(owner.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_company(&self, company_id: CompanyId) -> MarketplaceResult<Option<Company>> {
        let row = sqlx::query_as::<_, CompanyRow>(
            r#"
            SELECT company_id, name, website, created_by, created_at
            FROM companies
            WHERE company_id = $1
            "#,
        )
        .bind(company_id.into_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CompanyRow::into_company))
    }

    async fn list_companies_for_user(&self, user_id: UserId) -> MarketplaceResult<Vec<Company>> {
        let rows = sqlx::query_as::<_, CompanyRow>(
            r#"
            SELECT c.company_id, c.name, c.website, c.created_by, c.created_at
            FROM companies c
            JOIN company_members m ON m.company_id = c.company_id
            WHERE m.user_id = $1
            ORDER BY c.created_at, c.company_id
            "#,
        )
        .bind(user_id.into_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CompanyRow::into_company).collect())
    }

    async fn find_member(
        &self,
        company_id: CompanyId,
        user_id: UserId,
    ) -> MarketplaceResult<Option<CompanyMember>> {
        let row = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT company_id, user_id, member_role, created_at
            FROM company_members
            WHERE company_id = $1 AND user_id = $2
            "#,
        )
        .bind(company_id.into_uuid())
        .bind(user_id.into_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(MemberRow::into_member).transpose()
    }

    async fn upsert_member(&self, member: &CompanyMember) -> MarketplaceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO company_members (company_id, user_id, member_role, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (company_id, user_id)
            DO UPDATE SET member_role = EXCLUDED.member_role
            "#,
        )
        .bind(member.company_id.into_uuid())
        .bind(member.user_id.into_uuid())
        .bind(member.member_role.code())
        .bind(member.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_company(&self, company_id: CompanyId) -> MarketplaceResult<bool> {
        // jobs, applications, messages, members and saved jobs cascade
        let deleted = sqlx::query("DELETE FROM companies WHERE company_id = $1")
            .bind(company_id.into_uuid())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted > 0)
    }
}

// ============================================================================
// Jobs
// ============================================================================

impl JobRepository for PgMarketplaceRepository {
    async fn create_job(&self, job: &Job) -> MarketplaceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (
                job_id, company_id, title, description, location, tier, status,
                visibility_days, published_at, expires_at, view_count, apply_count,
                created_by, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(job.id.into_uuid())
        .bind(job.company_id.into_uuid())
        .bind(&job.title)
        .bind(&job.description)
        .bind(&job.location)
        .bind(job.tier.code())
        .bind(job.status.code())
        .bind(job.visibility_days)
        .bind(job.published_at)
        .bind(job.expires_at)
        .bind(job.view_count)
        .bind(job.apply_count)
        .bind(job.created_by.into_uuid())
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_job(&self, job_id: JobId) -> MarketplaceResult<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE job_id = $1"
        ))
        .bind(job_id.into_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(JobRow::into_job).transpose()
    }

    async fn save_job_transition(
        &self,
        job: &Job,
        expected: JobStatus,
    ) -> MarketplaceResult<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            UPDATE jobs
            SET status = $2,
                published_at = $3,
                expires_at = $4,
                updated_at = $5
            WHERE job_id = $1 AND status = $6
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(job.id.into_uuid())
        .bind(job.status.code())
        .bind(job.published_at)
        .bind(job.expires_at)
        .bind(job.updated_at)
        .bind(expected.code())
        .fetch_optional(&self.pool)
        .await?;

        if row.is_none() {
            tracing::warn!(job_id = %job.id, expected = expected.code(), "Job transition lost a race");
        }
        row.map(JobRow::into_job).transpose()
    }

    async fn list_public_jobs(
        &self,
        query: &JobQuery,
        now: DateTime<Utc>,
    ) -> MarketplaceResult<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM jobs
            WHERE status = 'active'
              AND (expires_at IS NULL OR expires_at > $1)
              AND ($2::TEXT IS NULL OR tier = $2)
              AND ($3::TEXT IS NULL
                   OR lower(title) LIKE $3
                   OR lower(description) LIKE $3
                   OR lower(coalesce(location, '')) LIKE $3)
            ORDER BY
                CASE tier WHEN 'premium' THEN 2 WHEN 'featured' THEN 1 ELSE 0 END DESC,
                published_at DESC NULLS LAST,
                job_id
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(now)
        .bind(query.tier.map(|t| t.code()))
        .bind(query.search_text().map(|t| like_pattern(&t)))
        .bind(i64::from(query.limit))
        .bind(i64::from(query.offset))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(JobRow::into_job).collect()
    }

    async fn list_jobs_by_status(
        &self,
        status: JobStatus,
        page: &PageRequest,
    ) -> MarketplaceResult<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM jobs
            WHERE status = $1
            ORDER BY updated_at, job_id
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(status.code())
        .bind(i64::from(page.limit()))
        .bind(i64::from(page.offset()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(JobRow::into_job).collect()
    }

    async fn list_company_jobs(&self, company_id: CompanyId) -> MarketplaceResult<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE company_id = $1 ORDER BY created_at DESC, job_id"
        ))
        .bind(company_id.into_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(JobRow::into_job).collect()
    }

    async fn increment_job_views(&self, job_id: JobId) -> MarketplaceResult<()> {
        sqlx::query("UPDATE jobs SET view_count = view_count + 1 WHERE job_id = $1")
            .bind(job_id.into_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn expire_due_jobs(&self, now: DateTime<Utc>) -> MarketplaceResult<u64> {
        let expired = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'expired', tier = 'normal', updated_at = $1
            WHERE status = 'active' AND expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(expired)
    }

    async fn employer_job_summary(&self, user_id: UserId) -> MarketplaceResult<EmployerJobSummary> {
        let rows = sqlx::query_as::<_, StatusSummaryRow>(
            r#"
            SELECT
                j.status,
                COUNT(*) AS jobs,
                COUNT(*) FILTER (WHERE j.tier <> 'normal') AS promoted,
                COALESCE(SUM(j.view_count), 0)::BIGINT AS views,
                COALESCE(SUM(j.apply_count), 0)::BIGINT AS applications
            FROM jobs j
            JOIN company_members m ON m.company_id = j.company_id
            WHERE m.user_id = $1
            GROUP BY j.status
            "#,
        )
        .bind(user_id.into_uuid())
        .fetch_all(&self.pool)
        .await?;

        let mut summary = EmployerJobSummary::default();
        for row in rows {
            let status = JobStatus::from_code(&row.status).ok_or_else(|| {
                MarketplaceError::Internal(format!("unknown job status: {}", row.status))
            })?;
            summary.by_status.push((status, row.jobs));
            summary.promoted += row.promoted;
            summary.total_views += row.views;
            summary.total_applications += row.applications;
        }
        Ok(summary)
    }
}

// ============================================================================
// Applications
// ============================================================================

impl ApplicationRepository for PgMarketplaceRepository {
    async fn create_application(&self, application: &Application) -> MarketplaceResult<()> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO applications (
                application_id, job_id, user_id, status, resume_url,
                cover_letter, score, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(application.id.into_uuid())
        .bind(application.job_id.into_uuid())
        .bind(application.user_id.into_uuid())
        .bind(application.status.code())
        .bind(&application.resume_url)
        .bind(&application.cover_letter)
        .bind(application.score)
        .bind(application.created_at)
        .bind(application.updated_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(MarketplaceError::DuplicateApplication);
            }
            Err(e) => return Err(e.into()),
        }

        sqlx::query("UPDATE jobs SET apply_count = apply_count + 1 WHERE job_id = $1")
            .bind(application.job_id.into_uuid())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_application(
        &self,
        application_id: ApplicationId,
    ) -> MarketplaceResult<Option<Application>> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE application_id = $1"
        ))
        .bind(application_id.into_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ApplicationRow::into_application).transpose()
    }

    async fn save_application_status(
        &self,
        application: &Application,
        expected: ApplicationStatus,
    ) -> MarketplaceResult<bool> {
        let updated = sqlx::query(
            r#"
            UPDATE applications
            SET status = $2, updated_at = $3
            WHERE application_id = $1 AND status = $4
            "#,
        )
        .bind(application.id.into_uuid())
        .bind(application.status.code())
        .bind(application.updated_at)
        .bind(expected.code())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated > 0)
    }

    async fn list_job_applications(&self, job_id: JobId) -> MarketplaceResult<Vec<Application>> {
        let rows = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE job_id = $1 ORDER BY created_at, application_id"
        ))
        .bind(job_id.into_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ApplicationRow::into_application).collect()
    }

    async fn list_user_applications(
        &self,
        user_id: UserId,
    ) -> MarketplaceResult<Vec<Application>> {
        let rows = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE user_id = $1 ORDER BY created_at DESC, application_id"
        ))
        .bind(user_id.into_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ApplicationRow::into_application).collect()
    }

    async fn application_status_counts(
        &self,
        user_id: UserId,
    ) -> MarketplaceResult<Vec<(ApplicationStatus, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*)
            FROM applications
            WHERE user_id = $1
            GROUP BY status
            "#,
        )
        .bind(user_id.into_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(status, n)| {
                ApplicationStatus::from_code(&status)
                    .map(|s| (s, n))
                    .ok_or_else(|| {
                        MarketplaceError::Internal(format!("unknown application status: {status}"))
                    })
            })
            .collect()
    }
}

// ============================================================================
// Messages
// ============================================================================

impl MessageRepository for PgMarketplaceRepository {
    async fn create_message(&self, message: &Message) -> MarketplaceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (message_id, application_id, sender_id, body, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(message.id.into_uuid())
        .bind(message.application_id.into_uuid())
        .bind(message.sender_id.into_uuid())
        .bind(&message.body)
        .bind(message.is_read)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_messages(
        &self,
        application_id: ApplicationId,
    ) -> MarketplaceResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT message_id, application_id, sender_id, body, is_read, created_at
            FROM messages
            WHERE application_id = $1
            ORDER BY created_at, message_id
            "#,
        )
        .bind(application_id.into_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MessageRow::into_message).collect())
    }

    async fn mark_thread_read(
        &self,
        application_id: ApplicationId,
        reader: UserId,
    ) -> MarketplaceResult<u64> {
        let updated = sqlx::query(
            r#"
            UPDATE messages
            SET is_read = TRUE
            WHERE application_id = $1 AND sender_id <> $2 AND NOT is_read
            "#,
        )
        .bind(application_id.into_uuid())
        .bind(reader.into_uuid())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated)
    }
}

// ============================================================================
// Saved jobs
// ============================================================================

impl SavedJobRepository for PgMarketplaceRepository {
    async fn save_job(
        &self,
        user_id: UserId,
        job_id: JobId,
        now: DateTime<Utc>,
    ) -> MarketplaceResult<bool> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO saved_jobs (user_id, job_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, job_id) DO NOTHING
            "#,
        )
        .bind(user_id.into_uuid())
        .bind(job_id.into_uuid())
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(inserted > 0)
    }

    async fn unsave_job(&self, user_id: UserId, job_id: JobId) -> MarketplaceResult<bool> {
        let deleted = sqlx::query("DELETE FROM saved_jobs WHERE user_id = $1 AND job_id = $2")
            .bind(user_id.into_uuid())
            .bind(job_id.into_uuid())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted > 0)
    }

    async fn list_saved_jobs(&self, user_id: UserId) -> MarketplaceResult<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM jobs
            JOIN (
                SELECT job_id AS saved_job_id, created_at AS saved_at
                FROM saved_jobs
                WHERE user_id = $1
            ) s ON s.saved_job_id = jobs.job_id
            ORDER BY s.saved_at DESC
            "#
        ))
        .bind(user_id.into_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(JobRow::into_job).collect()
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(sqlx::FromRow)]
struct CompanyRow {
    company_id: Uuid,
    name: String,
    website: Option<String>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl CompanyRow {
    fn into_company(self) -> Company {
        Company {
            id: CompanyId::from_uuid(self.company_id),
            name: self.name,
            website: self.website,
            created_by: UserId::from_uuid(self.created_by),
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    company_id: Uuid,
    user_id: Uuid,
    member_role: String,
    created_at: DateTime<Utc>,
}

impl MemberRow {
    fn into_member(self) -> MarketplaceResult<CompanyMember> {
        let member_role = MemberRole::from_code(&self.member_role).ok_or_else(|| {
            MarketplaceError::Internal(format!("unknown member role: {}", self.member_role))
        })?;
        Ok(CompanyMember {
            company_id: CompanyId::from_uuid(self.company_id),
            user_id: UserId::from_uuid(self.user_id),
            member_role,
            created_at: self.created_at,
        })
    }
}

/// Raw `jobs` row selected with [`JOB_COLUMNS`]
#[derive(Debug, sqlx::FromRow)]
pub struct JobRow {
    job_id: Uuid,
    company_id: Uuid,
    title: String,
    description: String,
    location: Option<String>,
    tier: String,
    status: String,
    visibility_days: i32,
    published_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    view_count: i64,
    apply_count: i64,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl JobRow {
    pub fn into_job(self) -> MarketplaceResult<Job> {
        let tier = JobTier::from_code(&self.tier)
            .ok_or_else(|| MarketplaceError::Internal(format!("unknown job tier: {}", self.tier)))?;
        let status = JobStatus::from_code(&self.status).ok_or_else(|| {
            MarketplaceError::Internal(format!("unknown job status: {}", self.status))
        })?;

        Ok(Job {
            id: JobId::from_uuid(self.job_id),
            company_id: CompanyId::from_uuid(self.company_id),
            title: self.title,
            description: self.description,
            location: self.location,
            tier,
            status,
            visibility_days: self.visibility_days,
            published_at: self.published_at,
            expires_at: self.expires_at,
            view_count: self.view_count,
            apply_count: self.apply_count,
            created_by: UserId::from_uuid(self.created_by),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ApplicationRow {
    application_id: Uuid,
    job_id: Uuid,
    user_id: Uuid,
    status: String,
    resume_url: Option<String>,
    cover_letter: Option<String>,
    score: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ApplicationRow {
    fn into_application(self) -> MarketplaceResult<Application> {
        let status = ApplicationStatus::from_code(&self.status).ok_or_else(|| {
            MarketplaceError::Internal(format!("unknown application status: {}", self.status))
        })?;
        Ok(Application {
            id: ApplicationId::from_uuid(self.application_id),
            job_id: JobId::from_uuid(self.job_id),
            user_id: UserId::from_uuid(self.user_id),
            status,
            resume_url: self.resume_url,
            cover_letter: self.cover_letter,
            score: self.score,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    message_id: Uuid,
    application_id: Uuid,
    sender_id: Uuid,
    body: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    fn into_message(self) -> Message {
        Message {
            id: kernel::id::MessageId::from_uuid(self.message_id),
            application_id: ApplicationId::from_uuid(self.application_id),
            sender_id: UserId::from_uuid(self.sender_id),
            body: self.body,
            is_read: self.is_read,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct StatusSummaryRow {
    status: String,
    jobs: i64,
    promoted: i64,
    views: i64,
    applications: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rust"), "%rust%");
        assert_eq!(like_pattern("100%_off"), "%100\\%\\_off%");
    }
}
