//! Domain Value Objects

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// JobTier
// ============================================================================

/// Promotion tier of a job posting
///
/// Ordering follows listing priority: `Normal < Featured < Premium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobTier {
    #[default]
    Normal,
    Featured,
    Premium,
}

impl JobTier {
    pub const fn code(&self) -> &'static str {
        match self {
            JobTier::Normal => "normal",
            JobTier::Featured => "featured",
            JobTier::Premium => "premium",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "normal" => Some(JobTier::Normal),
            "featured" => Some(JobTier::Featured),
            "premium" => Some(JobTier::Premium),
            _ => None,
        }
    }

    /// Whether the tier is bought rather than the default
    pub const fn is_promoted(&self) -> bool {
        !matches!(self, JobTier::Normal)
    }
}

impl fmt::Display for JobTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// JobStatus
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Draft,
    Pending,
    Active,
    Expired,
    Rejected,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Draft,
        JobStatus::Pending,
        JobStatus::Active,
        JobStatus::Expired,
        JobStatus::Rejected,
    ];

    pub const fn code(&self) -> &'static str {
        match self {
            JobStatus::Draft => "draft",
            JobStatus::Pending => "pending",
            JobStatus::Active => "active",
            JobStatus::Expired => "expired",
            JobStatus::Rejected => "rejected",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "draft" => Some(JobStatus::Draft),
            "pending" => Some(JobStatus::Pending),
            "active" => Some(JobStatus::Active),
            "expired" => Some(JobStatus::Expired),
            "rejected" => Some(JobStatus::Rejected),
            _ => None,
        }
    }

    /// A payment may publish the job from this state
    pub const fn is_publishable(&self) -> bool {
        matches!(self, JobStatus::Draft | JobStatus::Pending | JobStatus::Expired)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// ApplicationStatus
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    Submitted,
    Reviewing,
    Shortlisted,
    Interview,
    Offered,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const fn code(&self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Reviewing => "reviewing",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Interview => "interview",
            ApplicationStatus::Offered => "offered",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "submitted" => Some(ApplicationStatus::Submitted),
            "reviewing" => Some(ApplicationStatus::Reviewing),
            "shortlisted" => Some(ApplicationStatus::Shortlisted),
            "interview" => Some(ApplicationStatus::Interview),
            "offered" => Some(ApplicationStatus::Offered),
            "rejected" => Some(ApplicationStatus::Rejected),
            "withdrawn" => Some(ApplicationStatus::Withdrawn),
            _ => None,
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Offered | ApplicationStatus::Rejected | ApplicationStatus::Withdrawn
        )
    }

    /// Transitions the hiring side may make
    ///
    /// Rejection is allowed from every non-terminal state. Withdrawal belongs
    /// to the applicant and is never an employer move.
    pub fn employer_can_move_to(&self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;

        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, Rejected) => true,
            (Submitted, Reviewing | Shortlisted) => true,
            (Reviewing, Shortlisted | Interview) => true,
            (Shortlisted, Interview) => true,
            (Interview, Offered) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// MemberRole
// ============================================================================

/// Role of a user inside one company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Owner,
    Recruiter,
}

impl MemberRole {
    pub const fn code(&self) -> &'static str {
        match self {
            MemberRole::Owner => "owner",
            MemberRole::Recruiter => "recruiter",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "owner" => Some(MemberRole::Owner),
            "recruiter" => Some(MemberRole::Recruiter),
            _ => None,
        }
    }
}

// ============================================================================
// JobQuery
// ============================================================================

/// Filters for the public job listing
#[derive(Debug, Clone, Default)]
pub struct JobQuery {
    /// Case-insensitive match against title, description and location
    pub text: Option<String>,
    pub tier: Option<JobTier>,
    pub limit: u32,
    pub offset: u32,
}

impl JobQuery {
    /// Normalized search text, `None` when blank
    pub fn search_text(&self) -> Option<String> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
    }
}
