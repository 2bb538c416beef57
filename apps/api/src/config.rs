use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    pub openai_api_key: String,
    pub embedding_model: String,
    /// Base URL under which long-lived signed-document links are issued.
    pub public_base_url: String,
    /// Platform-wide kill switch for every generative-AI call.
    pub ai_features_enabled: bool,
    pub upload_dedup_ttl_secs: u64,
    pub docusign: DocusignConfig,
    pub port: u16,
    pub rust_log: String,
}

/// E-signature credentials. Every field is optional so the service can boot
/// without them; offer operations report a provider precondition failure instead.
#[derive(Debug, Clone, Default)]
pub struct DocusignConfig {
    pub base_url: Option<String>,
    pub account_id: Option<String>,
    pub access_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("PORT must be a valid port number")?;

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            openai_api_key: require_env("OPENAI_API_KEY")?,
            embedding_model: std::env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{port}"))
                .trim_end_matches('/')
                .to_string(),
            ai_features_enabled: parse_bool_env("AI_FEATURES_ENABLED", true)?,
            upload_dedup_ttl_secs: std::env::var("UPLOAD_DEDUP_TTL_SECS")
                .unwrap_or_else(|_| "86400".to_string())
                .parse::<u64>()
                .context("UPLOAD_DEDUP_TTL_SECS must be a whole number of seconds")?,
            docusign: DocusignConfig {
                base_url: optional_env("DOCUSIGN_BASE_URL"),
                account_id: optional_env("DOCUSIGN_ACCOUNT_ID"),
                access_token: optional_env("DOCUSIGN_ACCESS_TOKEN"),
            },
            port,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool_env(key: &str, default: bool) -> Result<bool> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => parse_bool(&raw).with_context(|| format!("{key} must be true or false")),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
