//! Billing Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Plans, payments, the credit ledger, gateway trait
//! - `application/` - Use cases (checkout, reconciliation, credit upgrade)
//! - `infra/` - PostgreSQL, in-memory, Stripe and NOWPayments adapters
//! - `presentation/` - HTTP handlers, webhooks, SSE, router
//!
//! ## Money Model
//! - A `Payment` row is written `pending` as soon as a provider hands out an
//!   intent or invoice, keyed by the provider's id
//! - Client confirmations and provider webhooks converge on one settlement
//!   that runs at most once per payment
//! - Credits live in an append-only ledger whose latest row holds the
//!   balance, which never goes negative
//!
//! ## Security Model
//! - Client-reported payment success is re-checked with the provider
//! - Webhooks are accepted only with a valid provider signature
//! - Credit spend and tier change commit together or not at all

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::BillingConfig;
pub use application::events::PaymentEvents;
pub use domain::repository::BillingStore;
pub use error::{BillingError, BillingResult};
pub use infra::memory::MemoryBillingRepository;
pub use infra::nowpayments::NowPaymentsGateway;
pub use infra::postgres::PgBillingRepository;
pub use infra::stripe::StripeGateway;
pub use presentation::router::{BillingBackend, PgBillingBackend, billing_router};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

#[cfg(test)]
mod tests;
