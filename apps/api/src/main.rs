mod analysis;
mod capability;
mod config;
mod db;
mod errors;
mod extraction;
mod interviews;
mod llm_client;
mod models;
mod offers;
mod routes;
mod similarity;
mod state;
mod storage;
#[cfg(test)]
mod testing;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::offers::docusign::DocusignClient;
use crate::routes::build_router;
use crate::similarity::embedder::OpenAiEmbedder;
use crate::state::AppState;
use crate::storage::{blob::S3BlobStore, dedup::RedisEventLedger, postgres::PgCandidateStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Talent API v{}", env!("CARGO_PKG_VERSION"));
    if !config.ai_features_enabled {
        warn!("AI features are disabled platform-wide (AI_FEATURES_ENABLED=false)");
    }

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize Redis
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // Initialize AI clients
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let embedder = OpenAiEmbedder::new(
        config.openai_api_key.clone(),
        config.embedding_model.clone(),
    )?;
    info!("Embedding client initialized (model: {})", embedder.model());

    // Initialize e-signature client
    let docusign = DocusignClient::new(config.docusign.clone())?;
    if docusign.is_configured() {
        info!("DocuSign client initialized");
    } else {
        warn!("DocuSign credentials missing; offer operations will fail until configured");
    }

    // Build app state
    let state = AppState {
        store: Arc::new(PgCandidateStore::new(db)),
        blobs: Arc::new(S3BlobStore::new(s3, config.s3_bucket.clone())),
        ledger: Arc::new(RedisEventLedger::new(redis, config.upload_dedup_ttl_secs)),
        text_service: Arc::new(llm),
        embedder: Arc::new(embedder),
        signatures: Arc::new(docusign),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "talent-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // Path-style addressing so MinIO endpoints resolve.
    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}
