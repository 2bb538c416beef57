pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::analysis::handlers as analysis;
use crate::extraction::handlers as extraction;
use crate::interviews::handlers as interviews;
use crate::offers::handlers as offers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Screening
        .route("/api/v1/resume/extract", post(analysis::handle_extract))
        .route(
            "/api/v1/orgs/:org_id/candidates/:candidate_id/evaluate",
            post(analysis::handle_evaluate),
        )
        .route("/api/v1/events/upload", post(extraction::handle_upload_event))
        // Interviews
        .route(
            "/api/v1/orgs/:org_id/candidates/:candidate_id/interviews",
            post(interviews::handle_record_session),
        )
        // Offers
        .route(
            "/api/v1/orgs/:org_id/candidates/:candidate_id/offer",
            post(offers::handle_create_offer),
        )
        .route(
            "/api/v1/orgs/:org_id/candidates/:candidate_id/offer/refresh",
            post(offers::handle_refresh_offer),
        )
        .route("/api/v1/webhooks/docusign", post(offers::handle_docusign_webhook))
        .route("/api/v1/files/*key", get(offers::handle_get_file))
        .with_state(state)
}
