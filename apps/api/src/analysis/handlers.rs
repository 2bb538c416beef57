//! Axum route handlers for candidate evaluation.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::pipeline::{evaluate, EvaluateRequest, EvaluationOutcome};
use crate::capability::request_ai;
use crate::errors::AppError;
use crate::extraction::resolver::ResumeSource;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub resume_text: Option<String>,
    pub resume_url: Option<String>,
    /// Org whose kill switch applies. Platform flag only when omitted.
    pub org_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub text: String,
    pub chars: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/orgs/:org_id/candidates/:candidate_id/evaluate
///
/// Runs extraction (if needed), match analysis, vector matching and the
/// auto-report gate, then persists the result on the candidate.
pub async fn handle_evaluate(
    State(state): State<AppState>,
    Path((org_id, candidate_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<EvaluateRequest>,
) -> Result<Json<EvaluationOutcome>, AppError> {
    let outcome = evaluate(&state, org_id, candidate_id, request).await?;
    Ok(Json(outcome))
}

/// POST /api/v1/resume/extract
///
/// Extraction only. Returns the resolved text without scoring or persisting it.
pub async fn handle_extract(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, AppError> {
    let source = match (request.resume_text, request.resume_url) {
        (Some(text), _) if !text.trim().is_empty() => ResumeSource::Inline(text),
        (_, Some(url)) if !url.trim().is_empty() => ResumeSource::Reference(url),
        _ => {
            return Err(AppError::InvalidInput(
                "resume_text or resume_url is required".to_string(),
            ))
        }
    };

    let settings = match request.org_id {
        Some(org_id) => state
            .store
            .get_org_settings(org_id)
            .await
            .map_err(AppError::Internal)?,
        None => None,
    };
    let permit = request_ai(state.platform_flags(), settings.as_ref())?;

    let text = state
        .resolver()
        .resolve(&permit, &source)
        .await?;

    Ok(Json(ExtractResponse {
        chars: text.chars().count(),
        text,
    }))
}
