//! Offer lifecycle: create → poll / webhook → signed document.
//!
//! Every offer write goes through `CandidateStore::update_offer`, which applies an
//! [`OfferChange`] under a row lock and keeps the envelope index in step. The poll
//! and webhook paths share [`apply_provider_status`], so both obey the same merge
//! rules (see `models::offer`). A status change names its envelope, and the store
//! drops it if a newer envelope was sent in the meantime.
//!
//! Signed-document caching is best-effort. A failed fetch or upload is logged and
//! the status write still commits.

use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::{Candidate, CandidateRef};
use crate::models::offer::{EnvelopeStatus, Offer, OfferChange, OfferUpdate, OfferWrite};
use crate::offers::docusign::{EnvelopeRequest, SignatureError};
use crate::offers::letter::{render_letter, LetterDetails};
use crate::state::AppState;

const SIGNED_DOCUMENT_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateOfferRequest {
    pub job_title: Option<String>,
    pub salary: Option<String>,
    pub start_date: Option<String>,
    /// Replaces the default letter body (HTML or plain text).
    pub content: Option<String>,
    pub email_subject: Option<String>,
}

/// Provider status notification, normalised from either payload shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    pub envelope_id: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookOutcome {
    Applied {
        candidate_id: Uuid,
        status: EnvelopeStatus,
    },
    /// No candidate owns this envelope. Acknowledged without changes.
    UnknownEnvelope,
    /// The candidate has since been sent a newer envelope.
    StaleEnvelope,
    /// The envelope already reached a different terminal status, which is kept.
    Settled {
        candidate_id: Uuid,
        status: EnvelopeStatus,
    },
}

pub fn signed_document_key(org_id: Uuid, candidate_id: Uuid, envelope_id: &str) -> String {
    format!("orgs/{org_id}/candidates/{candidate_id}/offers/{envelope_id}/signed.pdf")
}

pub fn signed_document_url(public_base_url: &str, key: &str, token: &str) -> String {
    format!("{public_base_url}/api/v1/files/{key}?token={token}")
}

fn signature_error(e: SignatureError) -> AppError {
    if e.is_precondition() {
        return AppError::ProviderPrecondition(e.to_string());
    }
    match e {
        SignatureError::Api { status: 404, message } => {
            AppError::NotFound(format!("Envelope not found at provider: {message}"))
        }
        other => AppError::Internal(
            anyhow::Error::new(other).context("E-signature provider call failed"),
        ),
    }
}

async fn load_candidate(
    state: &AppState,
    org_id: Uuid,
    candidate_id: Uuid,
) -> Result<Candidate, AppError> {
    state
        .store
        .get_candidate(org_id, candidate_id)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))
}

/// Sends a new offer envelope. Not idempotent: each call creates a new envelope.
pub async fn create_offer(
    state: &AppState,
    org_id: Uuid,
    candidate_id: Uuid,
    request: CreateOfferRequest,
) -> Result<Offer, AppError> {
    let candidate = load_candidate(state, org_id, candidate_id).await?;

    let signer_email = candidate
        .email
        .clone()
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| AppError::InvalidInput("Candidate has no email address".to_string()))?;
    let signer_name = candidate
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| signer_email.clone());

    let organization = state
        .store
        .get_organization(org_id)
        .await
        .map_err(AppError::Internal)?;
    let organization_name = organization
        .as_ref()
        .map(|o| o.name.as_str())
        .unwrap_or("Our team");

    let job_title = match request.job_title.clone() {
        Some(title) => Some(title),
        None => match candidate.job_id {
            Some(job_id) => state
                .store
                .get_job(org_id, job_id)
                .await
                .map_err(AppError::Internal)?
                .map(|j| j.title),
            None => None,
        },
    };

    let document_html = render_letter(
        &LetterDetails {
            organization_name,
            candidate_name: &signer_name,
            job_title: job_title.as_deref(),
            salary: request.salary.as_deref(),
            start_date: request.start_date.as_deref(),
        },
        request.content.as_deref(),
    );

    let envelope = state
        .signatures
        .create_envelope(&EnvelopeRequest {
            email_subject: request
                .email_subject
                .clone()
                .unwrap_or_else(|| format!("Your offer from {organization_name}")),
            document_name: "Offer Letter".to_string(),
            document_html,
            signer_name,
            signer_email,
        })
        .await
        .map_err(signature_error)?;

    let change = OfferChange::Sent {
        envelope_id: envelope.envelope_id.clone(),
        job_title,
        salary: request.salary,
        start_date: request.start_date,
        at: Utc::now(),
    };
    let update = state
        .store
        .update_offer(org_id, candidate_id, &change)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))?;

    info!(candidate_id = %candidate_id, envelope_id = %envelope.envelope_id, "Offer sent");
    Ok(update.offer)
}

/// Polls the provider for the candidate's current envelope and applies the result.
pub async fn refresh_offer(
    state: &AppState,
    org_id: Uuid,
    candidate_id: Uuid,
) -> Result<Offer, AppError> {
    let candidate = load_candidate(state, org_id, candidate_id).await?;
    let offer = candidate.offer().cloned().unwrap_or_default();
    let envelope_id = offer
        .docusign_envelope_id
        .clone()
        .ok_or_else(|| AppError::NotFound("Candidate has no offer envelope".to_string()))?;

    let raw = state
        .signatures
        .envelope_status(&envelope_id)
        .await
        .map_err(signature_error)?;

    let owner = CandidateRef {
        org_id,
        candidate_id,
    };
    let update = apply_provider_status(state, owner, &offer, &envelope_id, &raw).await?;
    Ok(update.offer)
}

/// Maps a raw provider status and merges it into the offer.
///
/// On `completed`, the signed PDF is cached first (unless a URL is already stored)
/// so the link lands in the same write as the status. `current` only decides whether
/// to fetch the document; the envelope and terminal checks run inside the store write.
pub async fn apply_provider_status(
    state: &AppState,
    owner: CandidateRef,
    current: &Offer,
    envelope_id: &str,
    raw_status: &str,
) -> Result<OfferUpdate, AppError> {
    let status = EnvelopeStatus::from_provider(raw_status);

    let signed_document_url = if wants_signed_document(current, envelope_id, &status) {
        cache_signed_document(state, owner, envelope_id).await
    } else {
        None
    };

    let change = OfferChange::Status {
        envelope_id: envelope_id.to_string(),
        status: status.clone(),
        at: Utc::now(),
        signed_document_url,
    };
    let update = state
        .store
        .update_offer(owner.org_id, owner.candidate_id, &change)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| {
            AppError::NotFound(format!("Candidate {} not found", owner.candidate_id))
        })?;

    match update.write {
        OfferWrite::Applied => info!(
            candidate_id = %owner.candidate_id,
            envelope_id,
            status = status.as_str(),
            "Offer status applied"
        ),
        write => info!(
            candidate_id = %owner.candidate_id,
            envelope_id,
            status = status.as_str(),
            ?write,
            "Offer status dropped"
        ),
    }
    Ok(update)
}

fn wants_signed_document(current: &Offer, envelope_id: &str, status: &EnvelopeStatus) -> bool {
    let settled_elsewhere = current
        .docusign_status
        .as_ref()
        .is_some_and(|s| s.is_terminal() && s != status);
    *status == EnvelopeStatus::Completed
        && current.docusign_envelope_id.as_deref() == Some(envelope_id)
        && current.signed_document_url.is_none()
        && !settled_elsewhere
}

/// Fetches the signed PDF and stores it behind a long-lived token URL. Never fails.
pub async fn cache_signed_document(
    state: &AppState,
    owner: CandidateRef,
    envelope_id: &str,
) -> Option<String> {
    let document = match state.signatures.signed_document(envelope_id).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(envelope_id, error = %e, "Failed to fetch signed document");
            return None;
        }
    };

    let key = signed_document_key(owner.org_id, owner.candidate_id, envelope_id);
    let token = Uuid::new_v4().simple().to_string();
    if let Err(e) = state
        .blobs
        .upload(&key, document, SIGNED_DOCUMENT_CONTENT_TYPE, &token)
        .await
    {
        warn!(envelope_id, error = %e, "Failed to store signed document");
        return None;
    }

    Some(signed_document_url(&state.config.public_base_url, &key, &token))
}

/// Accepts a flat `{envelopeId, status}` body or a Connect
/// `{event, data: {envelopeId, envelopeSummary: {status}}}` body.
pub fn parse_webhook_payload(payload: &Value) -> Result<WebhookEvent, AppError> {
    let data = payload.get("data").filter(|d| d.is_object());

    let envelope_id = [payload.get("envelopeId"), data.and_then(|d| d.get("envelopeId"))]
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str().map(str::trim).filter(|s| !s.is_empty()))
        .ok_or_else(|| AppError::InvalidInput("envelopeId is required".to_string()))?;

    let status = [
        payload.get("status"),
        data.and_then(|d| d.get("envelopeSummary"))
            .and_then(|s| s.get("status")),
        data.and_then(|d| d.get("status")),
    ]
    .into_iter()
    .flatten()
    .find_map(|v| v.as_str().map(str::trim).filter(|s| !s.is_empty()))
    .map(String::from)
    .or_else(|| {
        payload
            .get("event")
            .and_then(Value::as_str)
            .and_then(|e| e.strip_prefix("envelope-"))
            .map(String::from)
    })
    .ok_or_else(|| AppError::InvalidInput("status is required".to_string()))?;

    Ok(WebhookEvent {
        envelope_id: envelope_id.to_string(),
        status,
    })
}

/// Applies a webhook event to whichever candidate owns the envelope.
pub async fn reconcile_webhook(
    state: &AppState,
    event: &WebhookEvent,
) -> Result<WebhookOutcome, AppError> {
    let Some(owner) = state
        .store
        .find_offer_owner(&event.envelope_id)
        .await
        .map_err(AppError::Internal)?
    else {
        info!(envelope_id = %event.envelope_id, "Webhook for unknown envelope, ignoring");
        return Ok(WebhookOutcome::UnknownEnvelope);
    };

    let Some(candidate) = state
        .store
        .get_candidate(owner.org_id, owner.candidate_id)
        .await
        .map_err(AppError::Internal)?
    else {
        warn!(envelope_id = %event.envelope_id, "Envelope index points at a missing candidate");
        return Ok(WebhookOutcome::UnknownEnvelope);
    };

    let offer = candidate.offer().cloned().unwrap_or_default();
    if offer.docusign_envelope_id.as_deref() != Some(event.envelope_id.as_str()) {
        info!(
            candidate_id = %candidate.id,
            envelope_id = %event.envelope_id,
            "Webhook for superseded envelope, ignoring"
        );
        return Ok(WebhookOutcome::StaleEnvelope);
    }

    let update =
        apply_provider_status(state, owner, &offer, &event.envelope_id, &event.status).await?;
    let status = update
        .offer
        .docusign_status
        .unwrap_or_else(|| EnvelopeStatus::from_provider(&event.status));
    Ok(match update.write {
        OfferWrite::Applied => WebhookOutcome::Applied {
            candidate_id: candidate.id,
            status,
        },
        OfferWrite::StaleEnvelope => WebhookOutcome::StaleEnvelope,
        OfferWrite::Settled => WebhookOutcome::Settled {
            candidate_id: candidate.id,
            status,
        },
    })
}

/// Serves a cached signed document when `token` matches the object's stored token.
pub async fn fetch_signed_document(
    state: &AppState,
    key: &str,
    token: &str,
) -> Result<Bytes, AppError> {
    let not_found = || AppError::NotFound("File not found".to_string());

    let stored = state
        .blobs
        .download_token(key)
        .await
        .map_err(|e| AppError::Storage(format!("{e:#}")))?
        .ok_or_else(not_found)?;
    if token.is_empty() || stored != token {
        return Err(not_found());
    }

    state
        .blobs
        .download(state.blobs.default_bucket(), key)
        .await
        .map_err(|e| AppError::Storage(format!("{e:#}")))
}
