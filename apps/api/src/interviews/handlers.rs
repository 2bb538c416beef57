use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interviews::merge::record_session;
use crate::models::interview::InterviewSession;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecordSessionRequest {
    pub session: InterviewSession,
    /// Id of the upcoming slot to replace, when it differs from `session.id`.
    pub match_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecordSessionResponse {
    pub interviews: Vec<InterviewSession>,
}

/// POST /api/v1/orgs/:org_id/candidates/:candidate_id/interviews
pub async fn handle_record_session(
    State(state): State<AppState>,
    Path((org_id, candidate_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<RecordSessionRequest>,
) -> Result<Json<RecordSessionResponse>, AppError> {
    let interviews = record_session(
        state.store.as_ref(),
        org_id,
        candidate_id,
        request.session,
        request.match_key.as_deref(),
    )
    .await?;

    Ok(Json(RecordSessionResponse { interviews }))
}
