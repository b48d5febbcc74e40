use crate::errors::AuthError;
use crate::middleware::auth::extract_bearer_token;
use crate::observability::hash_for_correlation;
use crate::observability::metrics::record_token_renewal;
use crate::routes::AppState;
use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewTokenResponse {
    pub token: String,
    pub was_from_previous_key: bool,
    pub success: bool,
    pub message: String,
}

/// Handle token renewal
///
/// POST /api/renovar-token
///
/// Exchanges the bearer token for a fresh one signed with the current
/// secret. Tokens signed with the previous secret are accepted here in every
/// posture; that is how clients get off a retired secret.
#[instrument(name = "auth.token.renew", skip_all, fields(status))]
pub async fn handle_renew_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<RenewTokenResponse>, AuthError> {
    let result = extract_bearer_token(&headers).and_then(|token| state.authority.renew(token));

    let renewal = match result {
        Ok(renewal) => renewal,
        Err(e) => {
            tracing::Span::current().record("status", "error");
            record_token_renewal("error", false);
            tracing::debug!(target: "auth.handlers", error = %e, "Token renewal rejected");
            return Err(e);
        }
    };

    tracing::Span::current().record("status", "success");
    record_token_renewal("success", renewal.was_from_previous_key);
    tracing::info!(
        target: "auth.handlers",
        subject = %hash_for_correlation(&renewal.subject_id.to_string()),
        was_from_previous_key = renewal.was_from_previous_key,
        "Session token renewed"
    );

    let message = if renewal.was_from_previous_key {
        "Token renewed: it was signed with the previous secret"
    } else {
        "Token renewed"
    };

    Ok(Json(RenewTokenResponse {
        token: renewal.token,
        was_from_previous_key: renewal.was_from_previous_key,
        success: true,
        message: message.to_string(),
    }))
}
