//! Billing Error Types
//!
//! Billing-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use marketplace::MarketplaceError;
use thiserror::Error;

/// Billing-specific result type alias
pub type BillingResult<T> = Result<T, BillingError>;

#[derive(Debug, Error)]
pub enum BillingError {
    /// No active plan sells the requested tier
    #[error("No active plan for tier {0}")]
    PlanNotFound(String),

    #[error("Payment not found")]
    PaymentNotFound,

    #[error("Job not found")]
    JobNotFound,

    /// Caller is not a member of the job's company
    #[error("Not a member of this company")]
    NotCompanyMember,

    /// Payment belongs to another user or another job
    #[error("Payment does not belong to this request")]
    PaymentMismatch,

    #[error("Operation requires {0}")]
    RoleRequired(&'static str),

    /// Balance would drop below zero
    #[error("Insufficient credits")]
    InsufficientCredits,

    /// The job already has this tier or a better one
    #[error("Job is already {0}")]
    TierNotUpgradable(&'static str),

    /// Provider has not confirmed the payment
    #[error("Payment is {0}, not succeeded")]
    PaymentNotSucceeded(&'static str),

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Webhook signature missing or wrong
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// Provider is not configured on this deployment
    #[error("{0} payments are not configured")]
    ProviderDisabled(&'static str),

    /// Provider call failed or returned something unusable
    #[error("Payment provider error: {0}")]
    Provider(String),

    #[error(transparent)]
    Marketplace(#[from] MarketplaceError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for BillingError {
    fn from(err: reqwest::Error) -> Self {
        BillingError::Provider(err.to_string())
    }
}

impl BillingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BillingError::Marketplace(inner) => inner.status_code(),
            other => StatusCode::from_u16(other.kind().status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BillingError::PlanNotFound(_)
            | BillingError::PaymentNotFound
            | BillingError::JobNotFound => ErrorKind::NotFound,
            BillingError::NotCompanyMember
            | BillingError::PaymentMismatch
            | BillingError::RoleRequired(_) => ErrorKind::Forbidden,
            BillingError::InsufficientCredits => ErrorKind::PaymentRequired,
            BillingError::TierNotUpgradable(_) | BillingError::PaymentNotSucceeded(_) => {
                ErrorKind::Conflict
            }
            BillingError::Validation(_) => ErrorKind::UnprocessableEntity,
            BillingError::InvalidSignature => ErrorKind::BadRequest,
            BillingError::ProviderDisabled(_) => ErrorKind::ServiceUnavailable,
            BillingError::Provider(_) => ErrorKind::BadGateway,
            BillingError::Marketplace(inner) => inner.kind(),
            BillingError::Database(_) | BillingError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        match self {
            BillingError::Marketplace(inner) => inner.to_app_error(),
            BillingError::InsufficientCredits => AppError::new(self.kind(), self.to_string())
                .with_action("Buy credits or pay for this upgrade directly"),
            BillingError::Provider(_) => AppError::new(self.kind(), "Payment provider unavailable")
                .with_action("Try again; the payment stays pending until confirmed"),
            other if other.kind().is_server_error() => {
                AppError::new(other.kind(), "Internal server error")
            }
            other => AppError::new(other.kind(), other.to_string()),
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            BillingError::Database(e) => {
                tracing::error!(error = %e, "Billing database error");
            }
            BillingError::Internal(msg) => {
                tracing::error!(message = %msg, "Billing internal error");
            }
            BillingError::Provider(msg) => {
                tracing::error!(message = %msg, "Payment provider error");
            }
            BillingError::InvalidSignature => {
                tracing::warn!("Webhook with invalid signature");
            }
            BillingError::PaymentMismatch | BillingError::NotCompanyMember => {
                tracing::warn!(error = %self, "Billing access denied");
            }
            _ => {
                tracing::debug!(error = %self, "Billing error");
            }
        }
    }
}

impl From<BillingError> for AppError {
    fn from(err: BillingError) -> Self {
        err.to_app_error()
    }
}

impl IntoResponse for BillingError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            BillingError::InsufficientCredits.status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            BillingError::Provider("timeout".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            BillingError::Marketplace(MarketplaceError::JobNotFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            BillingError::InvalidSignature.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_provider_detail_is_hidden() {
        let err = BillingError::Provider("sk_live_leak in body".into()).to_app_error();
        assert_eq!(err.status_code(), 502);
        assert!(!err.message().contains("sk_live"));
        assert!(err.action().is_some());
    }
}
