//! LLM Client: the single point of entry for all Claude API calls.
//!
//! ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
//! Resume reading (vision) and match analysis both go through this module, behind
//! the `TextService` trait so pipelines can be exercised without the network.
//!
//! Model: claude-sonnet-4-5 (fixed, not configurable)
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

use crate::llm_client::prompts::{DOCUMENT_EXTRACT_PROMPT, DOCUMENT_EXTRACT_SYSTEM};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all LLM calls.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 8192;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),
}

/// Opaque generative-AI capabilities used by the core.
#[async_trait]
pub trait TextService: Send + Sync {
    /// Given document bytes and their MIME type, return the document's text.
    async fn extract_document_text(&self, bytes: &[u8], mime_type: &str)
        -> Result<String, LlmError>;

    /// Given a prompt, return the model's JSON response.
    async fn generate_json(&self, prompt: &str, system: &str)
        -> Result<serde_json::Value, LlmError>;
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    Image { source: MediaSource<'a> },
    Document { source: MediaSource<'a> },
}

#[derive(Debug, Serialize)]
struct MediaSource<'a> {
    #[serde(rename = "type")]
    source_type: &'a str,
    media_type: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// The single LLM client used by all services.
/// Wraps the Anthropic Messages API with structured output helpers.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    api_url: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()?,
            api_key,
            api_url: ANTHROPIC_API_URL.to_string(),
        })
    }

    #[cfg(test)]
    fn with_api_url(api_key: String, api_url: String) -> anyhow::Result<Self> {
        Ok(Self {
            api_url,
            ..Self::new(api_key)?
        })
    }

    /// Makes a single call to the Claude API, returning the full response object.
    /// Failures, including 429 and 5xx, are returned to the caller as-is.
    async fn call(
        &self,
        content: Vec<ContentPart<'_>>,
        system: &str,
    ) -> Result<LlmResponse, LlmError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content,
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("LLM API returned {}: {}", status, body);
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let llm_response: LlmResponse = response.json().await?;

        debug!(
            "LLM call succeeded: input_tokens={}, output_tokens={}",
            llm_response.usage.input_tokens, llm_response.usage.output_tokens
        );

        Ok(llm_response)
    }
}

#[async_trait]
impl TextService for LlmClient {
    async fn extract_document_text(
        &self,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<String, LlmError> {
        let media = MediaSource {
            source_type: "base64",
            media_type: mime_type,
            data: BASE64.encode(bytes),
        };
        let attachment = match mime_type {
            "application/pdf" => ContentPart::Document { source: media },
            m if m.starts_with("image/") => ContentPart::Image { source: media },
            other => return Err(LlmError::UnsupportedMedia(other.to_string())),
        };

        let response = self
            .call(
                vec![
                    attachment,
                    ContentPart::Text {
                        text: DOCUMENT_EXTRACT_PROMPT,
                    },
                ],
                DOCUMENT_EXTRACT_SYSTEM,
            )
            .await?;

        Ok(response.text().unwrap_or_default().to_string())
    }

    /// The prompt must instruct the model to return valid JSON.
    async fn generate_json(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<serde_json::Value, LlmError> {
        let response = self
            .call(vec![ContentPart::Text { text: prompt }], system)
            .await?;

        let text = response.text().ok_or(LlmError::EmptyContent)?;

        // Strip markdown code fences if the model wraps JSON in them
        let text = strip_json_fences(text);

        serde_json::from_str(text).map_err(LlmError::Parse)
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
