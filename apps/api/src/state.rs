use std::sync::Arc;

use crate::capability::PlatformFlags;
use crate::config::Config;
use crate::extraction::resolver::Resolver;
use crate::llm_client::TextService;
use crate::offers::docusign::SignatureProvider;
use crate::similarity::embedder::Embedder;
use crate::storage::{BlobStore, CandidateStore, EventLedger};

/// Shared application state injected into all route handlers via Axum extractors.
///
/// Every external collaborator sits behind a trait object so pipelines run unchanged
/// against the in-memory fakes in tests.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CandidateStore>,
    pub blobs: Arc<dyn BlobStore>,
    /// Dedupe ledger for storage upload events (Redis in production).
    pub ledger: Arc<dyn EventLedger>,
    pub text_service: Arc<dyn TextService>,
    pub embedder: Arc<dyn Embedder>,
    pub signatures: Arc<dyn SignatureProvider>,
    pub config: Config,
}

impl AppState {
    pub fn platform_flags(&self) -> PlatformFlags {
        PlatformFlags {
            ai_enabled: self.config.ai_features_enabled,
        }
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver {
            text_service: self.text_service.as_ref(),
            blobs: self.blobs.as_ref(),
            s3_endpoint: &self.config.s3_endpoint,
        }
    }
}
