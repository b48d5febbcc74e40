//! Current subject handler.
//!
//! `GET /api/me` - returns the identity established by `require_auth`.

use crate::middleware::AuthenticatedSubject;
use axum::{Extension, Json};
use common::types::SubjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub subject_id: SubjectId,
    pub from_previous_key: bool,
}

pub async fn get_me(Extension(subject): Extension<AuthenticatedSubject>) -> Json<MeResponse> {
    tracing::debug!(target: "auth.handlers", "Returning authenticated subject");

    Json(MeResponse {
        subject_id: subject.subject_id,
        from_previous_key: subject.from_previous_secret,
    })
}
