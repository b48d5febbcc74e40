//! Bearer token authentication for protected routes.
//!
//! `require_auth` verifies the token through the Token Authority and stores an
//! [`AuthenticatedSubject`] in the request extensions. When the token was only
//! accepted under the previous secret, the response carries
//! `X-Token-Refresh-Available: true` so the client renews it.

use crate::errors::AuthError;
use crate::services::token_authority::TokenAuthority;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use common::session_renewal::REFRESH_SIGNAL_HEADER;
use common::types::SubjectId;
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    pub authority: Arc<TokenAuthority>,
}

/// Identity attached to an authenticated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedSubject {
    pub subject_id: SubjectId,
    /// Token was accepted under the previous secret and should be renewed.
    pub from_previous_secret: bool,
}

/// Extract Bearer token from the Authorization header.
///
/// Shared by `require_auth` and the renewal handler.
pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!(target: "auth.middleware.auth", "Missing Authorization header");
            AuthError::MissingCredentials
        })?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            tracing::debug!(target: "auth.middleware.auth", "Invalid Authorization header format");
            AuthError::MissingCredentials
        })
}

/// Authentication middleware for session tokens.
///
/// # Response
///
/// - 401 if the token is missing, invalid or expired
/// - 401 if it only verified under the previous secret in production
/// - Otherwise continues with [`AuthenticatedSubject`] in extensions
#[instrument(skip_all, name = "auth.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = extract_bearer_token(req.headers())?;
    let verification = state.authority.verify(token)?;

    let from_previous_secret = verification.from_previous_secret();
    // Defence in depth: `verify` already refuses the previous secret in production
    if from_previous_secret && state.authority.posture().is_production() {
        tracing::debug!(
            target: "auth.middleware.auth",
            "Rejecting token signed with the previous secret in production"
        );
        return Err(AuthError::RetiredSecret);
    }

    req.extensions_mut().insert(AuthenticatedSubject {
        subject_id: verification.subject_id(),
        from_previous_secret,
    });

    let mut response = next.run(req).await;

    if from_previous_secret {
        response.headers_mut().insert(
            HeaderName::from_static(REFRESH_SIGNAL_HEADER),
            HeaderValue::from_static("true"),
        );
    }

    Ok(response)
}
