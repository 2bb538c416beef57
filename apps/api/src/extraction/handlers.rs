use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::{info, warn};

use crate::extraction::upload::{handle_storage_event, StorageEvent, UploadOutcome};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StorageEventAck {
    pub received: usize,
    pub processed: usize,
}

/// POST /api/v1/events/upload
///
/// Storage event notifications. Always 200, even for bodies we cannot parse.
pub async fn handle_upload_event(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<StorageEventAck>) {
    let event: StorageEvent = serde_json::from_slice(&body).unwrap_or_else(|e| {
        warn!(error = %e, "Unparseable storage event, acknowledging without work");
        StorageEvent::default()
    });

    let received = event.records.len();
    let outcomes = handle_storage_event(&state, event).await;
    let processed = outcomes
        .iter()
        .filter(|o| matches!(o, UploadOutcome::Extracted { .. } | UploadOutcome::Unreadable))
        .count();

    info!(received, processed, "Storage event handled");
    (StatusCode::OK, Json(StorageEventAck { received, processed }))
}
