//! Marketplace Error Types
//!
//! Marketplace-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Marketplace-specific result type alias
pub type MarketplaceResult<T> = Result<T, MarketplaceError>;

#[derive(Debug, Error)]
pub enum MarketplaceError {
    #[error("Company not found")]
    CompanyNotFound,

    #[error("Job not found")]
    JobNotFound,

    #[error("Application not found")]
    ApplicationNotFound,

    /// Caller is not a member of the company that owns the resource
    #[error("Not a member of this company")]
    NotCompanyMember,

    /// Caller's role does not allow the operation
    #[error("Operation requires {0}")]
    RoleRequired(&'static str),

    /// Caller is neither the applicant nor a member of the hiring company
    #[error("Not a participant of this application")]
    NotParticipant,

    /// State machine rejected the transition
    #[error("Cannot {action} while {from}")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },

    /// Another request changed the row between read and write
    #[error("Resource was modified concurrently, retry")]
    ConcurrentModification,

    /// Job is not open for applications
    #[error("Job is not accepting applications")]
    JobNotOpen,

    #[error("Already applied to this job")]
    DuplicateApplication,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MarketplaceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            MarketplaceError::CompanyNotFound
            | MarketplaceError::JobNotFound
            | MarketplaceError::ApplicationNotFound => StatusCode::NOT_FOUND,
            MarketplaceError::NotCompanyMember
            | MarketplaceError::RoleRequired(_)
            | MarketplaceError::NotParticipant => StatusCode::FORBIDDEN,
            MarketplaceError::InvalidTransition { .. }
            | MarketplaceError::ConcurrentModification
            | MarketplaceError::JobNotOpen
            | MarketplaceError::DuplicateApplication => StatusCode::CONFLICT,
            MarketplaceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            MarketplaceError::Database(_) | MarketplaceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MarketplaceError::CompanyNotFound
            | MarketplaceError::JobNotFound
            | MarketplaceError::ApplicationNotFound => ErrorKind::NotFound,
            MarketplaceError::NotCompanyMember
            | MarketplaceError::RoleRequired(_)
            | MarketplaceError::NotParticipant => ErrorKind::Forbidden,
            MarketplaceError::InvalidTransition { .. }
            | MarketplaceError::ConcurrentModification
            | MarketplaceError::JobNotOpen
            | MarketplaceError::DuplicateApplication => ErrorKind::Conflict,
            MarketplaceError::Validation(_) => ErrorKind::UnprocessableEntity,
            MarketplaceError::Database(_) | MarketplaceError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Convert to AppError
    ///
    /// Server errors keep their detail out of the response body.
    pub fn to_app_error(&self) -> AppError {
        if self.kind().is_server_error() {
            return AppError::new(self.kind(), "Internal server error");
        }
        let err = AppError::new(self.kind(), self.to_string());
        match self {
            MarketplaceError::NotCompanyMember => {
                err.with_action("Ask a company owner to add you as a member")
            }
            _ => err,
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            MarketplaceError::Database(e) => {
                tracing::error!(error = %e, "Marketplace database error");
            }
            MarketplaceError::Internal(msg) => {
                tracing::error!(message = %msg, "Marketplace internal error");
            }
            MarketplaceError::NotCompanyMember
            | MarketplaceError::RoleRequired(_)
            | MarketplaceError::NotParticipant => {
                tracing::warn!(error = %self, "Marketplace access denied");
            }
            _ => {
                tracing::debug!(error = %self, "Marketplace error");
            }
        }
    }
}

impl From<MarketplaceError> for AppError {
    fn from(err: MarketplaceError) -> Self {
        err.to_app_error()
    }
}

impl IntoResponse for MarketplaceError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}
