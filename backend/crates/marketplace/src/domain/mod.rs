//! Domain Layer - Business logic and entities
//!
//! This layer contains:
//! - Domain entities (Company, Job, Application, Message)
//! - Domain value objects (JobTier, JobStatus, ApplicationStatus)
//! - Domain services (visibility window, listing order)
//! - Repository traits (interfaces)

pub mod entities;
pub mod repository;
pub mod services;
pub mod value_objects;
