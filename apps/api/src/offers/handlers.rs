//! Axum route handlers for offers, the e-signature webhook and signed-document files.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::offer::Offer;
use crate::offers::lifecycle::{
    create_offer, fetch_signed_document, parse_webhook_payload, reconcile_webhook,
    refresh_offer, CreateOfferRequest, WebhookOutcome,
};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct OfferResponse {
    pub offer: Offer,
}

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub token: Option<String>,
}

/// POST /api/v1/orgs/:org_id/candidates/:candidate_id/offer
///
/// Sends a new envelope. Calling it again sends a second envelope.
pub async fn handle_create_offer(
    State(state): State<AppState>,
    Path((org_id, candidate_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<CreateOfferRequest>,
) -> Result<Json<OfferResponse>, AppError> {
    let offer = create_offer(&state, org_id, candidate_id, request).await?;
    Ok(Json(OfferResponse { offer }))
}

/// POST /api/v1/orgs/:org_id/candidates/:candidate_id/offer/refresh
pub async fn handle_refresh_offer(
    State(state): State<AppState>,
    Path((org_id, candidate_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<OfferResponse>, AppError> {
    let offer = refresh_offer(&state, org_id, candidate_id).await?;
    Ok(Json(OfferResponse { offer }))
}

/// POST /api/v1/webhooks/docusign
///
/// Unknown and superseded envelopes are acknowledged with 200.
pub async fn handle_docusign_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<WebhookOutcome>, AppError> {
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidInput(format!("Webhook body is not JSON: {e}")))?;
    let event = parse_webhook_payload(&payload)?;
    let outcome = reconcile_webhook(&state, &event).await?;
    Ok(Json(outcome))
}

/// GET /api/v1/files/*key?token=
pub async fn handle_get_file(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<FileQuery>,
) -> Result<impl IntoResponse, AppError> {
    let key = key.trim_start_matches('/');
    let token = query.token.unwrap_or_default();
    let bytes = fetch_signed_document(&state, key, &token).await?;
    Ok(([(header::CONTENT_TYPE, "application/pdf")], bytes))
}
