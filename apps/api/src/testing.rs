//! In-memory fakes for every seam trait, plus fixtures.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sqlx::types::Json;
use uuid::Uuid;

use crate::config::{Config, DocusignConfig};
use crate::interviews::merge::merge_session;
use crate::llm_client::{LlmError, TextService};
use crate::models::candidate::{Candidate, CandidateRef, EvaluationUpdate};
use crate::models::interview::InterviewSession;
use crate::models::job::Job;
use crate::models::offer::{OfferChange, OfferUpdate, OfferWrite};
use crate::models::organization::{OrgSettings, Organization};
use crate::offers::docusign::{EnvelopeRequest, EnvelopeSummary, SignatureError, SignatureProvider};
use crate::similarity::embedder::{Embedder, EmbeddingError};
use crate::state::AppState;
use crate::storage::{BlobStore, CandidateStore, EventLedger};

pub const TEST_BUCKET: &str = "talent-test";

// ────────────────────────────────────────────────────────────────────────────
// Fixtures
// ────────────────────────────────────────────────────────────────────────────

pub fn sample_job() -> Job {
    Job {
        id: Uuid::new_v4(),
        org_id: Uuid::new_v4(),
        title: "Backend Engineer".to_string(),
        description: "Design, build and operate Rust services on Postgres and Kafka.".to_string(),
        requirements: Some("5+ years of backend experience, Rust or Go".to_string()),
        embedding: Vec::new(),
        created_at: Utc::now(),
    }
}

pub fn sample_candidate() -> Candidate {
    let now = Utc::now();
    Candidate {
        id: Uuid::new_v4(),
        org_id: Uuid::new_v4(),
        job_id: None,
        name: Some("Ada Lovelace".to_string()),
        email: Some("ada@example.com".to_string()),
        phone: None,
        links: Json(Vec::new()),
        resume_url: None,
        resume_text: None,
        resume_parsed_at: None,
        score: None,
        vector_match_score: None,
        summary: None,
        match_reason: None,
        skills: Json(Vec::new()),
        experience: Json(Vec::new()),
        education: Json(Vec::new()),
        embedding: Vec::new(),
        analysis: None,
        offer: None,
        interviews: Json(Vec::new()),
        created_at: now,
        updated_at: now,
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/talent_test".to_string(),
        redis_url: "redis://localhost:6379".to_string(),
        s3_bucket: TEST_BUCKET.to_string(),
        s3_endpoint: "http://localhost:9000".to_string(),
        aws_access_key_id: "test".to_string(),
        aws_secret_access_key: "test".to_string(),
        anthropic_api_key: "test".to_string(),
        openai_api_key: "test".to_string(),
        embedding_model: "text-embedding-3-small".to_string(),
        public_base_url: "http://localhost:8080".to_string(),
        ai_features_enabled: true,
        upload_dedup_ttl_secs: 60,
        docusign: DocusignConfig::default(),
        port: 8080,
        rust_log: "debug".to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// MemoryStore
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
    candidates: Mutex<HashMap<Uuid, Candidate>>,
    jobs: Mutex<HashMap<Uuid, Job>>,
    organizations: Mutex<HashMap<Uuid, Organization>>,
    envelopes: Mutex<HashMap<String, CandidateRef>>,
}

impl MemoryStore {
    pub fn insert_candidate(&self, candidate: Candidate) {
        self.candidates.lock().unwrap().insert(candidate.id, candidate);
    }

    pub fn candidate(&self, id: Uuid) -> Option<Candidate> {
        self.candidates.lock().unwrap().get(&id).cloned()
    }

    pub fn insert_job(&self, job: Job) {
        self.jobs.lock().unwrap().insert(job.id, job);
    }

    pub fn job(&self, id: Uuid) -> Option<Job> {
        self.jobs.lock().unwrap().get(&id).cloned()
    }

    pub fn insert_organization(&self, organization: Organization) {
        self.organizations
            .lock()
            .unwrap()
            .insert(organization.id, organization);
    }

    pub fn insert_settings(&self, org_id: Uuid, settings: OrgSettings) {
        self.insert_organization(Organization {
            id: org_id,
            name: "Acme".to_string(),
            settings: Json(settings),
            created_at: Utc::now(),
        });
    }

    fn with_candidate<T>(
        &self,
        org_id: Uuid,
        candidate_id: Uuid,
        f: impl FnOnce(&mut Candidate) -> T,
    ) -> Option<T> {
        let mut candidates = self.candidates.lock().unwrap();
        let candidate = candidates
            .get_mut(&candidate_id)
            .filter(|c| c.org_id == org_id)?;
        let result = f(candidate);
        candidate.updated_at = Utc::now();
        Some(result)
    }
}

#[async_trait]
impl CandidateStore for MemoryStore {
    async fn get_candidate(
        &self,
        org_id: Uuid,
        candidate_id: Uuid,
    ) -> anyhow::Result<Option<Candidate>> {
        Ok(self.candidate(candidate_id).filter(|c| c.org_id == org_id))
    }

    async fn get_job(&self, org_id: Uuid, job_id: Uuid) -> anyhow::Result<Option<Job>> {
        Ok(self.job(job_id).filter(|j| j.org_id == org_id))
    }

    async fn save_job_embedding(
        &self,
        org_id: Uuid,
        job_id: Uuid,
        embedding: &[f32],
    ) -> anyhow::Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.get_mut(&job_id).filter(|j| j.org_id == org_id) {
            if job.embedding.is_empty() {
                job.embedding = embedding.to_vec();
            }
        }
        Ok(())
    }

    async fn get_organization(&self, org_id: Uuid) -> anyhow::Result<Option<Organization>> {
        Ok(self.organizations.lock().unwrap().get(&org_id).cloned())
    }

    async fn record_resume_text(
        &self,
        org_id: Uuid,
        candidate_id: Uuid,
        resume_text: &str,
        parsed_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        self.with_candidate(org_id, candidate_id, |c| {
            c.resume_text = Some(resume_text.to_string());
            c.resume_parsed_at = Some(parsed_at);
        });
        Ok(())
    }

    async fn save_evaluation(
        &self,
        org_id: Uuid,
        candidate_id: Uuid,
        update: &EvaluationUpdate,
    ) -> anyhow::Result<()> {
        self.with_candidate(org_id, candidate_id, |c| {
            if update.name.is_some() {
                c.name = update.name.clone();
            }
            if update.email.is_some() {
                c.email = update.email.clone();
            }
            if update.phone.is_some() {
                c.phone = update.phone.clone();
            }
            c.links = Json(update.links.clone());
            c.resume_text = Some(update.resume_text.clone());
            c.resume_parsed_at.get_or_insert_with(Utc::now);
            c.score = Some(update.score);
            c.vector_match_score = Some(update.vector_match_score);
            c.skills = Json(update.skills.clone());
            c.experience = Json(update.experience.clone());
            c.education = Json(update.education.clone());
            c.embedding = update.embedding.clone();
            c.summary = Some(update.summary.clone());
            c.match_reason = Some(update.match_reason.clone());
            c.analysis = update.analysis.clone().map(Json);
        });
        Ok(())
    }

    async fn merge_interview_session(
        &self,
        org_id: Uuid,
        candidate_id: Uuid,
        session: InterviewSession,
        match_key: &str,
    ) -> anyhow::Result<Option<Vec<InterviewSession>>> {
        Ok(self.with_candidate(org_id, candidate_id, |c| {
            merge_session(&mut c.interviews.0, session, match_key);
            c.interviews.0.clone()
        }))
    }

    async fn update_offer(
        &self,
        org_id: Uuid,
        candidate_id: Uuid,
        change: &OfferChange,
    ) -> anyhow::Result<Option<OfferUpdate>> {
        let update = self.with_candidate(org_id, candidate_id, |c| {
            let mut offer = c.offer.as_ref().map(|o| o.0.clone()).unwrap_or_default();
            let write = offer.apply(change);
            if write == OfferWrite::Applied {
                c.offer = Some(Json(offer.clone()));
            }
            OfferUpdate { offer, write }
        });

        let applied = matches!(&update, Some(u) if u.write == OfferWrite::Applied);
        if let (true, Some(envelope_id)) = (applied, change.new_envelope_id()) {
            self.envelopes.lock().unwrap().insert(
                envelope_id.to_string(),
                CandidateRef {
                    org_id,
                    candidate_id,
                },
            );
        }
        Ok(update)
    }

    async fn find_offer_owner(&self, envelope_id: &str) -> anyhow::Result<Option<CandidateRef>> {
        Ok(self.envelopes.lock().unwrap().get(envelope_id).copied())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// FakeBlobStore / MemoryLedger
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeBlobStore {
    objects: Mutex<HashMap<(String, String), (Bytes, Option<String>)>>,
    downloads: AtomicUsize,
}

impl FakeBlobStore {
    pub fn put(&self, bucket: &str, key: &str, data: Bytes) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), (data, None));
    }

    pub fn download_calls(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    fn default_bucket(&self) -> &str {
        TEST_BUCKET
    }

    async fn download(&self, bucket: &str, key: &str) -> anyhow::Result<Bytes> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|(data, _)| data.clone())
            .ok_or_else(|| anyhow!("NoSuchKey: s3://{bucket}/{key}"))
    }

    async fn upload(
        &self,
        key: &str,
        data: Bytes,
        _content_type: &str,
        download_token: &str,
    ) -> anyhow::Result<()> {
        self.objects.lock().unwrap().insert(
            (TEST_BUCKET.to_string(), key.to_string()),
            (data, Some(download_token.to_string())),
        );
        Ok(())
    }

    async fn download_token(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .get(&(TEST_BUCKET.to_string(), key.to_string()))
            .and_then(|(_, token)| token.clone()))
    }
}

#[derive(Default)]
pub struct MemoryLedger {
    seen: Mutex<HashSet<String>>,
}

#[async_trait]
impl EventLedger for MemoryLedger {
    async fn first_seen(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.seen.lock().unwrap().insert(key.to_string()))
    }

    async fn release(&self, key: &str) -> anyhow::Result<()> {
        self.seen.lock().unwrap().remove(key);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// FakeTextService
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeTextService {
    analysis: Mutex<Option<Value>>,
    extracted_text: Mutex<String>,
    fail_generation: AtomicBool,
    fail_extraction: AtomicBool,
    generate_calls: AtomicUsize,
    extract_calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
    last_mime_type: Mutex<Option<String>>,
}

impl FakeTextService {
    pub fn with_analysis(self, analysis: Value) -> Self {
        self.set_analysis(analysis);
        self
    }

    pub fn with_extracted_text(self, text: &str) -> Self {
        *self.extracted_text.lock().unwrap() = text.to_string();
        self
    }

    pub fn failing_generation(self) -> Self {
        self.fail_generation();
        self
    }

    pub fn failing_extraction(self) -> Self {
        self.fail_extraction.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_analysis(&self, analysis: Value) {
        *self.analysis.lock().unwrap() = Some(analysis);
    }

    pub fn fail_generation(&self) {
        self.fail_generation.store(true, Ordering::SeqCst);
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }

    pub fn last_mime_type(&self) -> Option<String> {
        self.last_mime_type.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextService for FakeTextService {
    async fn extract_document_text(
        &self,
        _bytes: &[u8],
        mime_type: &str,
    ) -> Result<String, LlmError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_mime_type.lock().unwrap() = Some(mime_type.to_string());
        if self.fail_extraction.load(Ordering::SeqCst) {
            return Err(LlmError::Api {
                status: 500,
                message: "vision unavailable".to_string(),
            });
        }
        Ok(self.extracted_text.lock().unwrap().clone())
    }

    async fn generate_json(&self, prompt: &str, _system: &str) -> Result<Value, LlmError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        if self.fail_generation.load(Ordering::SeqCst) {
            return Err(LlmError::Api {
                status: 529,
                message: "overloaded".to_string(),
            });
        }
        Ok(self.analysis.lock().unwrap().clone().unwrap_or_else(|| json!({})))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// FakeEmbedder
// ────────────────────────────────────────────────────────────────────────────

/// Returns the same vector for every input, or fails when `vector` is `None`.
pub struct FakeEmbedder {
    vector: Mutex<Option<Vec<f32>>>,
    calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn constant(vector: Vec<f32>) -> Self {
        Self {
            vector: Mutex::new(Some(vector)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            vector: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_failing(&self) {
        *self.vector.lock().unwrap() = None;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed_raw(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.vector.lock().unwrap().clone().ok_or(EmbeddingError::Api {
            status: 500,
            message: "embedding service down".to_string(),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// FakeSignatureProvider
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeSignatureProvider {
    created: Mutex<Vec<EnvelopeRequest>>,
    statuses: Mutex<HashMap<String, String>>,
    unconfigured: AtomicBool,
    fail_documents: AtomicBool,
    document_calls: AtomicUsize,
}

impl FakeSignatureProvider {
    pub fn set_status(&self, envelope_id: &str, raw: &str) {
        self.statuses
            .lock()
            .unwrap()
            .insert(envelope_id.to_string(), raw.to_string());
    }

    pub fn set_unconfigured(&self) {
        self.unconfigured.store(true, Ordering::SeqCst);
    }

    pub fn fail_documents(&self) {
        self.fail_documents.store(true, Ordering::SeqCst);
    }

    pub fn restore_documents(&self) {
        self.fail_documents.store(false, Ordering::SeqCst);
    }

    pub fn created_requests(&self) -> Vec<EnvelopeRequest> {
        self.created.lock().unwrap().clone()
    }

    pub fn document_calls(&self) -> usize {
        self.document_calls.load(Ordering::SeqCst)
    }

    fn check_configured(&self) -> Result<(), SignatureError> {
        if self.unconfigured.load(Ordering::SeqCst) {
            return Err(SignatureError::NotConfigured("DOCUSIGN_ACCESS_TOKEN"));
        }
        Ok(())
    }
}

#[async_trait]
impl SignatureProvider for FakeSignatureProvider {
    async fn create_envelope(
        &self,
        request: &EnvelopeRequest,
    ) -> Result<EnvelopeSummary, SignatureError> {
        self.check_configured()?;
        let mut created = self.created.lock().unwrap();
        created.push(request.clone());
        Ok(EnvelopeSummary {
            envelope_id: format!("env-{}", created.len()),
            status: "sent".to_string(),
        })
    }

    async fn envelope_status(&self, envelope_id: &str) -> Result<String, SignatureError> {
        self.check_configured()?;
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(envelope_id)
            .cloned()
            .unwrap_or_else(|| "sent".to_string()))
    }

    async fn signed_document(&self, _envelope_id: &str) -> Result<Bytes, SignatureError> {
        self.check_configured()?;
        self.document_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_documents.load(Ordering::SeqCst) {
            return Err(SignatureError::Api {
                status: 500,
                message: "document service unavailable".to_string(),
            });
        }
        Ok(Bytes::from_static(b"%PDF-1.7 signed"))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// TestHarness
// ────────────────────────────────────────────────────────────────────────────

/// An `AppState` wired to fakes, with handles to each fake for assertions.
pub struct TestHarness {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub blobs: Arc<FakeBlobStore>,
    pub ledger: Arc<MemoryLedger>,
    pub text_service: Arc<FakeTextService>,
    pub embedder: Arc<FakeEmbedder>,
    pub signatures: Arc<FakeSignatureProvider>,
}

impl TestHarness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::default());
        let blobs = Arc::new(FakeBlobStore::default());
        let ledger = Arc::new(MemoryLedger::default());
        let text_service = Arc::new(FakeTextService::default());
        let embedder = Arc::new(FakeEmbedder::constant(vec![0.2, 0.4, 0.6]));
        let signatures = Arc::new(FakeSignatureProvider::default());

        let state = AppState {
            store: store.clone(),
            blobs: blobs.clone(),
            ledger: ledger.clone(),
            text_service: text_service.clone(),
            embedder: embedder.clone(),
            signatures: signatures.clone(),
            config: test_config(),
        };

        Self {
            state,
            store,
            blobs,
            ledger,
            text_service,
            embedder,
            signatures,
        }
    }

    pub fn with_analysis(self, analysis: Value) -> Self {
        self.text_service.set_analysis(analysis);
        self
    }

    pub fn with_failing_embedder(self) -> Self {
        self.embedder.set_failing();
        self
    }
}
