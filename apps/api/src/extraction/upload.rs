//! Upload trigger: storage event → extract → persist → evaluate.
//!
//! Fire-and-forget from the storage platform's point of view. Every failure is
//! caught and logged here; the HTTP handler always acknowledges with 200 so the
//! platform never redelivers because of our errors.

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::analysis::pipeline::evaluate_text;
use crate::capability::request_ai;
use crate::errors::AppError;
use crate::extraction::resolver::{ensure_sufficient, DocumentKind, StorageObject};
use crate::models::candidate::UNREADABLE_RESUME_SENTINEL;
use crate::state::AppState;

const CANDIDATES_SEGMENT: &str = "candidates";
const RESUME_FILE_PREFIX: &str = "resume_";

/// A resume upload that passed path validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub org_id: Uuid,
    pub candidate_id: Uuid,
    pub object: StorageObject,
}

/// Matches `.../<org_id>/candidates/<candidate_id>/resume_*.<ext>`.
///
/// Anything else is unrelated traffic and yields `None`.
pub fn parse_upload_path(bucket: &str, key: &str) -> Option<UploadTarget> {
    let segments: Vec<&str> = key.split('/').collect();
    let index = segments.iter().position(|s| *s == CANDIDATES_SEGMENT)?;

    let org_id = Uuid::parse_str(segments.get(index.checked_sub(1)?)?).ok()?;
    let candidate_id = Uuid::parse_str(segments.get(index + 1)?).ok()?;

    // The resume file must sit directly under the candidate folder.
    if segments.len() != index + 3 {
        return None;
    }
    let file_name = segments[index + 2];
    if !file_name.starts_with(RESUME_FILE_PREFIX) {
        return None;
    }
    DocumentKind::from_key(file_name)?;

    Some(UploadTarget {
        org_id,
        candidate_id,
        object: StorageObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
        },
    })
}

// ────────────────────────────────────────────────────────────────────────────
// S3 event notification payload
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct StorageEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<StorageEventRecord>,
}

#[derive(Debug, Deserialize)]
pub struct StorageEventRecord {
    #[serde(rename = "eventName", default)]
    pub event_name: String,
    pub s3: S3Entity,
}

#[derive(Debug, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct S3Object {
    /// URL-encoded, with spaces as `+`.
    pub key: String,
    #[serde(rename = "eTag", default)]
    pub e_tag: Option<String>,
}

impl StorageEventRecord {
    pub fn is_object_created(&self) -> bool {
        self.event_name.is_empty() || self.event_name.starts_with("ObjectCreated")
    }

    pub fn decoded_key(&self) -> String {
        let raw = self.s3.object.key.replace('+', " ");
        urlencoding::decode(&raw)
            .map(|k| k.into_owned())
            .unwrap_or(raw)
    }

    /// Dedupe key for the event ledger: the same object version is processed once.
    pub fn ledger_key(&self) -> String {
        format!(
            "{}/{}/{}",
            self.s3.bucket.name,
            self.decoded_key(),
            self.s3.object.e_tag.as_deref().unwrap_or("-")
        )
    }
}

/// What the trigger did with one uploaded object.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// Not a resume upload path; ignored.
    Ignored,
    /// This object version was already processed.
    Duplicate,
    /// AI features are switched off for the platform or the organization.
    Disabled,
    CandidateMissing,
    /// Stored the unreadable sentinel.
    Unreadable,
    /// Text stored; `evaluated` is true when the evaluation pipeline also ran.
    Extracted { evaluated: bool },
    Failed(String),
}

/// Processes every record of a storage event. Never fails.
pub async fn handle_storage_event(state: &AppState, event: StorageEvent) -> Vec<UploadOutcome> {
    let mut outcomes = Vec::with_capacity(event.records.len());
    for record in &event.records {
        if !record.is_object_created() {
            debug!(event = %record.event_name, "Ignoring non-create storage event");
            outcomes.push(UploadOutcome::Ignored);
            continue;
        }
        outcomes.push(process_record(state, record).await);
    }
    outcomes
}

async fn process_record(state: &AppState, record: &StorageEventRecord) -> UploadOutcome {
    let key = record.decoded_key();
    let Some(target) = parse_upload_path(&record.s3.bucket.name, &key) else {
        debug!(key = %key, "Upload path does not match resume shape, ignoring");
        return UploadOutcome::Ignored;
    };

    let ledger_key = record.ledger_key();
    match state.ledger.first_seen(&ledger_key).await {
        Ok(true) => {}
        Ok(false) => {
            info!(key = %key, "Upload event already processed, skipping");
            return UploadOutcome::Duplicate;
        }
        Err(e) => warn!(error = %e, "Upload dedupe ledger unavailable, processing anyway"),
    }

    let outcome = match process_upload(state, &target).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(
                candidate_id = %target.candidate_id,
                key = %key,
                error = %e,
                "Upload processing failed"
            );
            UploadOutcome::Failed(e.to_string())
        }
    };

    // Failed and disabled events stay eligible for redelivery.
    if matches!(outcome, UploadOutcome::Failed(_) | UploadOutcome::Disabled) {
        if let Err(e) = state.ledger.release(&ledger_key).await {
            warn!(key = %key, error = %e, "Failed to release upload dedupe key");
        }
    }
    outcome
}

/// Extracts an uploaded resume, stores the text, and evaluates when a job is attached.
pub async fn process_upload(
    state: &AppState,
    target: &UploadTarget,
) -> Result<UploadOutcome, AppError> {
    let settings = state
        .store
        .get_org_settings(target.org_id)
        .await
        .map_err(AppError::Internal)?;
    let permit = match request_ai(state.platform_flags(), settings.as_ref()) {
        Ok(permit) => permit,
        Err(reason) => {
            info!(org_id = %target.org_id, %reason, "Skipping resume upload");
            return Ok(UploadOutcome::Disabled);
        }
    };

    let Some(candidate) = state
        .store
        .get_candidate(target.org_id, target.candidate_id)
        .await
        .map_err(AppError::Internal)?
    else {
        warn!(candidate_id = %target.candidate_id, "Resume uploaded for unknown candidate");
        return Ok(UploadOutcome::CandidateMissing);
    };

    let raw = state
        .resolver()
        .extract_object(&permit, &target.object)
        .await?;

    let text = match ensure_sufficient(&raw) {
        Ok(text) => text,
        Err(AppError::InsufficientText(chars)) => {
            warn!(candidate_id = %candidate.id, chars, "Uploaded resume is unreadable");
            state
                .store
                .record_resume_text(
                    candidate.org_id,
                    candidate.id,
                    UNREADABLE_RESUME_SENTINEL,
                    Utc::now(),
                )
                .await
                .map_err(AppError::Internal)?;
            return Ok(UploadOutcome::Unreadable);
        }
        Err(e) => return Err(e),
    };

    state
        .store
        .record_resume_text(candidate.org_id, candidate.id, &text, Utc::now())
        .await
        .map_err(AppError::Internal)?;
    info!(candidate_id = %candidate.id, chars = text.chars().count(), "Resume text extracted");

    let Some(job_id) = candidate.job_id else {
        return Ok(UploadOutcome::Extracted { evaluated: false });
    };
    let Some(job) = state
        .store
        .get_job(candidate.org_id, job_id)
        .await
        .map_err(AppError::Internal)?
    else {
        warn!(
            candidate_id = %candidate.id,
            job_id = %job_id,
            "Candidate job not found, skipping evaluation"
        );
        return Ok(UploadOutcome::Extracted { evaluated: false });
    };

    evaluate_text(state, &permit, &candidate, &job, settings.as_ref(), text).await?;
    Ok(UploadOutcome::Extracted { evaluated: true })
}
