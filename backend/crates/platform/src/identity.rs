//! Caller identity
//!
//! Sessions are issued by the upstream identity provider. This module only
//! verifies the signed token it hands out:
//!
//! ```text
//! <user uuid>.<role code>.<base64url(HMAC-SHA256(secret, "<user uuid>.<role code>"))>
//! ```
//!
//! The token is read from `Authorization: Bearer ...` first, then from the
//! session cookie. A verified [`Identity`] is placed in request extensions by
//! [`require_identity`].

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use kernel::error::app_error::AppError;
use kernel::id::UserId;
use kernel::role::UserRole;
use std::sync::Arc;

use crate::cookie::extract_cookie;
use crate::crypto::{constant_time_eq, from_base64_url, hmac_sha256, to_base64_url};

/// Verified caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub role: UserRole,
}

impl Identity {
    pub fn new(user_id: UserId, role: UserRole) -> Self {
        Self { user_id, role }
    }

    /// Reject callers without the admin role
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("Admin role required"))
        }
    }
}

/// Verification settings shared with the identity provider
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// HMAC key shared with the identity provider
    pub secret: Vec<u8>,
    /// Cookie checked when no bearer token is present
    pub cookie_name: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            secret: Vec::new(),
            cookie_name: "session".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("Missing identity token")]
    Missing,
    #[error("Malformed identity token")]
    Malformed,
    #[error("Identity token signature mismatch")]
    BadSignature,
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        AppError::unauthorized(err.to_string()).with_action("Sign in again")
    }
}

/// Sign an identity the way the identity provider does
pub fn sign_token(secret: &[u8], identity: &Identity) -> String {
    let payload = format!("{}.{}", identity.user_id, identity.role.code());
    let signature = hmac_sha256(secret, payload.as_bytes());
    format!("{}.{}", payload, to_base64_url(&signature))
}

/// Verify a token and return the identity it carries
pub fn verify_token(secret: &[u8], token: &str) -> Result<Identity, IdentityError> {
    let (payload, signature_b64) = token.rsplit_once('.').ok_or(IdentityError::Malformed)?;
    let (user_id, role) = payload.split_once('.').ok_or(IdentityError::Malformed)?;

    let signature = from_base64_url(signature_b64).map_err(|_| IdentityError::Malformed)?;
    let expected = hmac_sha256(secret, payload.as_bytes());
    if !constant_time_eq(&signature, &expected) {
        return Err(IdentityError::BadSignature);
    }

    let user_id: UserId = user_id.parse().map_err(|_| IdentityError::Malformed)?;
    let role = UserRole::from_code(role).ok_or(IdentityError::Malformed)?;
    Ok(Identity::new(user_id, role))
}

/// Pull the raw token from the Authorization header or the session cookie
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string());

    bearer.or_else(|| extract_cookie(headers, cookie_name))
}

/// Middleware that requires a verified identity
///
/// Use with `axum::middleware::from_fn_with_state`.
pub async fn require_identity(
    State(config): State<Arc<IdentityConfig>>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_token(req.headers(), &config.cookie_name)
        .ok_or_else(|| AppError::from(IdentityError::Missing).into_response())?;

    let identity = match verify_token(&config.secret, &token) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected identity token");
            return Err(AppError::from(e).into_response());
        }
    };

    tracing::debug!(user_id = %identity.user_id, role = %identity.role, "Identity verified");
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{HeaderValue, StatusCode};
    use axum::routing::get;
    use axum::{Extension, middleware};
    use tower::ServiceExt;

    const SECRET: &[u8] = b"identity-provider-shared-secret";

    #[test]
    fn test_sign_and_verify() {
        let identity = Identity::new(UserId::new(), UserRole::Employer);
        let token = sign_token(SECRET, &identity);
        assert_eq!(verify_token(SECRET, &token), Ok(identity));
    }

    #[test]
    fn test_tampered_role_is_rejected() {
        let identity = Identity::new(UserId::new(), UserRole::Talent);
        let token = sign_token(SECRET, &identity);
        let forged = token.replacen(".talent.", ".admin.", 1);
        assert_eq!(
            verify_token(SECRET, &forged),
            Err(IdentityError::BadSignature)
        );
    }

    #[test]
    fn test_wrong_secret_and_garbage() {
        let identity = Identity::new(UserId::new(), UserRole::Admin);
        let token = sign_token(SECRET, &identity);
        assert_eq!(
            verify_token(b"other", &token),
            Err(IdentityError::BadSignature)
        );
        assert_eq!(verify_token(SECRET, "garbage"), Err(IdentityError::Malformed));
    }

    #[test]
    fn test_extract_token_prefers_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session=from-cookie"));
        assert_eq!(
            extract_token(&headers, "session"),
            Some("from-cookie".to_string())
        );

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );
        assert_eq!(
            extract_token(&headers, "session"),
            Some("from-header".to_string())
        );
    }

    #[test]
    fn test_require_admin() {
        assert!(Identity::new(UserId::new(), UserRole::Admin).require_admin().is_ok());
        let err = Identity::new(UserId::new(), UserRole::Employer)
            .require_admin()
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_middleware_inserts_identity() {
        let config = Arc::new(IdentityConfig {
            secret: SECRET.to_vec(),
            ..IdentityConfig::default()
        });
        let app = Router::new()
            .route(
                "/me",
                get(|Extension(identity): Extension<Identity>| async move {
                    identity.role.code().to_string()
                }),
            )
            .layer(middleware::from_fn_with_state(config, require_identity));

        let identity = Identity::new(UserId::new(), UserRole::Recruiter);
        let token = sign_token(SECRET, &identity);

        let ok = app
            .clone()
            .oneshot(
                axum::http::Request::get("/me")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);

        let missing = app
            .oneshot(axum::http::Request::get("/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    }
}
