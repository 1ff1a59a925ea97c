//! Application Layer - Use Cases
//!
//! This layer orchestrates domain logic and infrastructure.

pub mod access;
pub mod applications;
pub mod browse_jobs;
pub mod companies;
pub mod config;
pub mod expire_jobs;
pub mod messaging;
pub mod moderate_job;
pub mod post_job;
pub mod saved_jobs;

pub use applications::{ApplicationWorkflowUseCase, ApplyInput};
pub use browse_jobs::BrowseJobsUseCase;
pub use companies::{CompanyUseCase, CreateCompanyInput};
pub use expire_jobs::ExpireJobsUseCase;
pub use messaging::MessagingUseCase;
pub use moderate_job::{ModerateJobUseCase, ModerationDecision};
pub use post_job::{DraftJobInput, PostJobUseCase};
pub use saved_jobs::SavedJobsUseCase;
