//! Marketplace Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, lifecycle rules, repository traits
//! - `application/` - Use cases
//! - `infra/` - PostgreSQL and in-memory repositories
//! - `presentation/` - HTTP handlers, DTOs, router
//!
//! ## Features
//! - Companies with owner/recruiter membership
//! - Job postings: draft → pending → active → expired, admin moderation
//! - Public listing ordered by tier, then recency
//! - Applications with an employer/talent status workflow
//! - Per-application message threads and saved jobs
//!
//! ## Security Model
//! - Every role check is enforced server-side from a verified identity
//! - Company membership gates all employer operations
//! - Application reject is a status update; rows are never deleted by the workflow

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::MarketplaceConfig;
pub use domain::repository::MarketplaceStore;
pub use error::{MarketplaceError, MarketplaceResult};
pub use infra::memory::MemoryMarketplaceRepository;
pub use infra::postgres::PgMarketplaceRepository;
pub use presentation::router::marketplace_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
