//! Application Layer - Use Cases
//!
//! This layer orchestrates domain logic and infrastructure.

pub mod checkout;
pub mod config;
pub mod credits;
pub mod dashboard;
pub mod events;
pub mod feature_upgrade;
pub mod reconcile;

pub use checkout::{CheckoutInput, CheckoutOutput, CheckoutUseCase};
pub use credits::{CreditSummary, CreditsUseCase};
pub use dashboard::{DashboardStats, DashboardUseCase};
pub use feature_upgrade::FeatureUpgradeUseCase;
pub use reconcile::{PaymentPurpose, ReconcilePaymentUseCase};
