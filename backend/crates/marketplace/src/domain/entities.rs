//! Domain Entities

use chrono::{DateTime, Utc};
use kernel::id::{ApplicationId, CompanyId, JobId, MessageId, UserId};

use crate::domain::services::expiry_for;
use crate::domain::value_objects::{ApplicationStatus, JobStatus, JobTier, MemberRole};
use crate::error::{MarketplaceError, MarketplaceResult};

// ============================================================================
// Company
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub website: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl Company {
    pub fn new(
        name: String,
        website: Option<String>,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CompanyId::new(),
            name,
            website,
            created_by,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyMember {
    pub company_id: CompanyId,
    pub user_id: UserId,
    pub member_role: MemberRole,
    pub created_at: DateTime<Utc>,
}

impl CompanyMember {
    pub fn new(
        company_id: CompanyId,
        user_id: UserId,
        member_role: MemberRole,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            company_id,
            user_id,
            member_role,
            created_at: now,
        }
    }
}

// ============================================================================
// Job
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub company_id: CompanyId,
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
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a confirmed payment did to a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaidUpgrade {
    pub tier: JobTier,
    pub published: bool,
}

impl Job {
    /// New job in `draft` at the `normal` tier
    pub fn draft(
        company_id: CompanyId,
        created_by: UserId,
        title: String,
        description: String,
        location: Option<String>,
        visibility_days: i32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: JobId::new(),
            company_id,
            title,
            description,
            location,
            tier: JobTier::Normal,
            status: JobStatus::Draft,
            visibility_days,
            published_at: None,
            expires_at: None,
            view_count: 0,
            apply_count: 0,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    fn invalid(&self, action: &'static str) -> MarketplaceError {
        MarketplaceError::InvalidTransition {
            from: self.status.code(),
            action,
        }
    }

    fn publish(&mut self, now: DateTime<Utc>) {
        self.status = JobStatus::Active;
        self.published_at = Some(now);
        self.expires_at = Some(expiry_for(now, self.visibility_days));
        self.updated_at = now;
    }

    /// draft → pending
    pub fn submit(&mut self, now: DateTime<Utc>) -> MarketplaceResult<()> {
        if self.status != JobStatus::Draft {
            return Err(self.invalid("submit"));
        }
        self.status = JobStatus::Pending;
        self.updated_at = now;
        Ok(())
    }

    /// pending → active, starting the visibility window at `now`
    pub fn approve(&mut self, now: DateTime<Utc>) -> MarketplaceResult<()> {
        if self.status != JobStatus::Pending {
            return Err(self.invalid("approve"));
        }
        self.publish(now);
        Ok(())
    }

    /// pending → rejected (terminal)
    pub fn reject(&mut self, now: DateTime<Utc>) -> MarketplaceResult<()> {
        if self.status != JobStatus::Pending {
            return Err(self.invalid("reject"));
        }
        self.status = JobStatus::Rejected;
        self.updated_at = now;
        Ok(())
    }

    /// Apply a settled plan purchase
    ///
    /// The tier only ever moves up. Draft, pending and expired jobs are
    /// published with the plan's window; an active job keeps its publish
    /// date and the later of the two expiries. A rejected job keeps its
    /// status.
    pub fn apply_paid_upgrade(
        &mut self,
        tier: JobTier,
        visibility_days: i32,
        now: DateTime<Utc>,
    ) -> PaidUpgrade {
        if tier > self.tier {
            self.tier = tier;
        }

        let mut published = false;
        if self.status.is_publishable() {
            self.visibility_days = visibility_days;
            self.publish(now);
            published = true;
        } else if self.status == JobStatus::Active {
            let extended = expiry_for(now, visibility_days);
            if self.expires_at.is_none_or(|current| current < extended) {
                self.expires_at = Some(extended);
            }
        }

        self.updated_at = now;
        PaidUpgrade {
            tier: self.tier,
            published,
        }
    }

    /// Flip to `featured` for one credit
    ///
    /// Returns `Ok(false)` when the job is already featured or premium, in
    /// which case no credit should be spent.
    pub fn apply_credit_upgrade(&mut self, now: DateTime<Utc>) -> MarketplaceResult<bool> {
        if self.tier.is_promoted() {
            return Ok(false);
        }
        if matches!(self.status, JobStatus::Rejected | JobStatus::Expired) {
            return Err(self.invalid("feature"));
        }
        self.tier = JobTier::Featured;
        self.updated_at = now;
        Ok(true)
    }

    /// active → expired once the window has closed; the tier resets
    pub fn expire_if_due(&mut self, now: DateTime<Utc>) -> bool {
        let due = self.expires_at.is_some_and(|at| at <= now);
        if self.status != JobStatus::Active || !due {
            return false;
        }
        self.status = JobStatus::Expired;
        self.tier = JobTier::Normal;
        self.updated_at = now;
        true
    }

    /// Visible in the public listing
    pub fn is_listed(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Active && self.expires_at.is_none_or(|at| at > now)
    }
}

// ============================================================================
// Application
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub user_id: UserId,
    pub status: ApplicationStatus,
    pub resume_url: Option<String>,
    pub cover_letter: Option<String>,
    pub score: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub fn new(
        job_id: JobId,
        user_id: UserId,
        resume_url: Option<String>,
        cover_letter: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ApplicationId::new(),
            job_id,
            user_id,
            status: ApplicationStatus::Submitted,
            resume_url,
            cover_letter,
            score: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move the application on behalf of the hiring company
    pub fn move_by_employer(
        &mut self,
        next: ApplicationStatus,
        now: DateTime<Utc>,
    ) -> MarketplaceResult<()> {
        if !self.status.employer_can_move_to(next) {
            return Err(MarketplaceError::InvalidTransition {
                from: self.status.code(),
                action: next.code(),
            });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Talent-initiated exit from any non-terminal state
    pub fn withdraw(&mut self, now: DateTime<Utc>) -> MarketplaceResult<()> {
        if self.status.is_terminal() {
            return Err(MarketplaceError::InvalidTransition {
                from: self.status.code(),
                action: "withdraw",
            });
        }
        self.status = ApplicationStatus::Withdrawn;
        self.updated_at = now;
        Ok(())
    }
}

// ============================================================================
// Message
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub application_id: ApplicationId,
    pub sender_id: UserId,
    pub body: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        application_id: ApplicationId,
        sender_id: UserId,
        body: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            application_id,
            sender_id,
            body,
            is_read: false,
            created_at: now,
        }
    }
}

// ============================================================================
// SavedJob
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedJob {
    pub user_id: UserId,
    pub job_id: JobId,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Summaries
// ============================================================================

/// Aggregates over the jobs of every company a user belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployerJobSummary {
    pub by_status: Vec<(JobStatus, i64)>,
    pub promoted: i64,
    pub total_views: i64,
    pub total_applications: i64,
}

impl EmployerJobSummary {
    pub fn count(&self, status: JobStatus) -> i64 {
        self.by_status
            .iter()
            .find(|(s, _)| *s == status)
            .map_or(0, |(_, n)| *n)
    }
}
