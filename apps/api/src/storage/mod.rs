//! Persistence seams.
//!
//! `AppState` carries each collaborator as an `Arc<dyn Trait>` so handlers and
//! pipelines never name a concrete backend. Production wiring uses Postgres, S3 and
//! Redis; tests swap in the in-memory fakes from `crate::testing`.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::candidate::{Candidate, CandidateRef, EvaluationUpdate};
use crate::models::interview::InterviewSession;
use crate::models::job::Job;
use crate::models::offer::{OfferChange, OfferUpdate};
use crate::models::organization::{OrgSettings, Organization};

pub mod blob;
pub mod dedup;
pub mod postgres;

/// Document store for organizations, jobs and candidates.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    async fn get_candidate(&self, org_id: Uuid, candidate_id: Uuid)
        -> anyhow::Result<Option<Candidate>>;

    async fn get_job(&self, org_id: Uuid, job_id: Uuid) -> anyhow::Result<Option<Job>>;

    /// Persists a freshly generated job embedding. Existing non-empty embeddings are kept.
    async fn save_job_embedding(
        &self,
        org_id: Uuid,
        job_id: Uuid,
        embedding: &[f32],
    ) -> anyhow::Result<()>;

    async fn get_organization(&self, org_id: Uuid) -> anyhow::Result<Option<Organization>>;

    /// Screening policy for an organization. `None` means the defaults apply.
    async fn get_org_settings(&self, org_id: Uuid) -> anyhow::Result<Option<OrgSettings>> {
        Ok(self.get_organization(org_id).await?.map(|o| o.settings.0))
    }

    async fn record_resume_text(
        &self,
        org_id: Uuid,
        candidate_id: Uuid,
        resume_text: &str,
        parsed_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    async fn save_evaluation(
        &self,
        org_id: Uuid,
        candidate_id: Uuid,
        update: &EvaluationUpdate,
    ) -> anyhow::Result<()>;

    /// Atomically merges `session` into the candidate's interview list.
    /// Returns `None` when the candidate does not exist.
    async fn merge_interview_session(
        &self,
        org_id: Uuid,
        candidate_id: Uuid,
        session: InterviewSession,
        match_key: &str,
    ) -> anyhow::Result<Option<Vec<InterviewSession>>>;

    /// Atomically applies `change` to the candidate's offer sub-record, maintaining
    /// the envelope index. The envelope check in `Offer::apply` runs under the same
    /// lock as the write. Returns `None` when the candidate does not exist.
    async fn update_offer(
        &self,
        org_id: Uuid,
        candidate_id: Uuid,
        change: &OfferChange,
    ) -> anyhow::Result<Option<OfferUpdate>>;

    /// Reverse lookup through the envelope index.
    async fn find_offer_owner(&self, envelope_id: &str) -> anyhow::Result<Option<CandidateRef>>;
}

/// Object storage for resumes and signed documents.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Bucket used for objects this service writes.
    fn default_bucket(&self) -> &str;

    async fn download(&self, bucket: &str, key: &str) -> anyhow::Result<Bytes>;

    /// Uploads to the default bucket, tagging the object with a download token.
    async fn upload(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        download_token: &str,
    ) -> anyhow::Result<()>;

    /// Download token stored on an object in the default bucket, if the object exists.
    async fn download_token(&self, key: &str) -> anyhow::Result<Option<String>>;
}

/// Remembers which storage events were already processed.
#[async_trait]
pub trait EventLedger: Send + Sync {
    /// Returns `true` the first time `key` is seen within the ledger's retention window.
    async fn first_seen(&self, key: &str) -> anyhow::Result<bool>;

    /// Forgets `key` so a redelivery of the same event is processed again.
    async fn release(&self, key: &str) -> anyhow::Result<()>;
}
