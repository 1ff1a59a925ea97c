//! Domain Layer - Business logic and entities
//!
//! This layer contains:
//! - Domain entities (Plan, Payment, LedgerEntry, WebhookEvent)
//! - Domain value objects (PaymentStatus, PaymentProvider, LedgerReason)
//! - Repository traits and the payment gateway port

pub mod entities;
pub mod gateway;
pub mod repository;
pub mod value_objects;
