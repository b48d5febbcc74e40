use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::jwt::JwtValidationError;
use serde::Serialize;
use thiserror::Error;

/// Message returned for every authentication failure.
///
/// Missing header, bad signature, expiry and previous-secret rejection in
/// production all look identical to the caller.
pub const GENERIC_TOKEN_ERROR: &str = "The access token is invalid or expired";

/// Token-level failure from the Token Authority.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Not a compact `header.payload.signature` token, or oversized.
    /// Rejected before any HMAC work.
    #[error("The access token is invalid or expired")]
    Malformed,

    /// Signature matched no accepted secret, or claims failed validation.
    #[error("The access token is invalid or expired")]
    InvalidOrExpired,
}

impl From<JwtValidationError> for TokenError {
    fn from(err: JwtValidationError) -> Self {
        match err {
            JwtValidationError::TokenTooLarge | JwtValidationError::MalformedToken => {
                TokenError::Malformed
            }
            JwtValidationError::IatTooFarInFuture => TokenError::InvalidOrExpired,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing or malformed Authorization header")]
    MissingCredentials,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] TokenError),

    /// Token verified under the previous secret while running in production.
    #[error("Token signed with retired secret")]
    RetiredSecret,

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Internal server error")]
    Internal,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AuthError::MissingCredentials
            | AuthError::InvalidToken(_)
            | AuthError::RetiredSecret => (StatusCode::UNAUTHORIZED, GENERIC_TOKEN_ERROR),
            AuthError::Crypto(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal cryptographic error occurred",
            ),
            AuthError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred",
            ),
        };

        let mut response = (
            status,
            Json(ErrorResponse {
                error: message.to_string(),
            }),
        )
            .into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Bearer"),
            );
        }

        response
    }
}
