use crate::routes::AppState;
use crate::services::token_authority::RotationStatus;
use axum::{extract::State, Json};
use std::sync::Arc;

/// GET /api/jwt-status
///
/// Reports whether a rotation window is open. The route is only mounted
/// outside production.
#[tracing::instrument(name = "auth.jwt_status", skip_all)]
pub async fn handle_jwt_status(State(state): State<Arc<AppState>>) -> Json<RotationStatus> {
    Json(state.authority.rotation_status())
}
