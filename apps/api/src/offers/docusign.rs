//! E-signature client: DocuSign eSignature REST v2.1.
//!
//! All provider traffic goes through the `SignatureProvider` trait. Credentials are
//! optional at startup; calls made without them fail with `NotConfigured`, which the
//! offer lifecycle reports as a provider precondition failure.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::DocusignConfig;

/// Anchor text in the letter where the signer's signature is placed.
pub const SIGNATURE_ANCHOR: &str = "/sn1/";

const API_PREFIX: &str = "restapi/v2.1/accounts";

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("E-signature provider is not configured: missing {0}")]
    NotConfigured(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected provider response: {0}")]
    Parse(String),
}

impl SignatureError {
    /// Credential problems the operator must fix, as opposed to transient failures.
    pub fn is_precondition(&self) -> bool {
        match self {
            SignatureError::NotConfigured(_) => true,
            SignatureError::Api { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }
}

/// Everything needed to create and send one envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopeRequest {
    pub email_subject: String,
    pub document_name: String,
    /// HTML letter containing [`SIGNATURE_ANCHOR`].
    pub document_html: String,
    pub signer_name: String,
    pub signer_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeSummary {
    pub envelope_id: String,
    /// Raw provider status, e.g. `sent`.
    pub status: String,
}

#[async_trait]
pub trait SignatureProvider: Send + Sync {
    async fn create_envelope(&self, request: &EnvelopeRequest)
        -> Result<EnvelopeSummary, SignatureError>;

    /// Live raw status of an envelope.
    async fn envelope_status(&self, envelope_id: &str) -> Result<String, SignatureError>;

    /// The combined signed PDF of a completed envelope.
    async fn signed_document(&self, envelope_id: &str) -> Result<Bytes, SignatureError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeDefinition<'a> {
    email_subject: &'a str,
    documents: Vec<Document<'a>>,
    recipients: Recipients<'a>,
    status: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Document<'a> {
    document_base64: String,
    name: &'a str,
    file_extension: &'a str,
    document_id: &'a str,
}

#[derive(Debug, Serialize)]
struct Recipients<'a> {
    signers: Vec<Signer<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Signer<'a> {
    email: &'a str,
    name: &'a str,
    recipient_id: &'a str,
    routing_order: &'a str,
    tabs: Tabs<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tabs<'a> {
    sign_here_tabs: Vec<SignHereTab<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignHereTab<'a> {
    anchor_string: &'a str,
    anchor_units: &'a str,
    anchor_x_offset: &'a str,
    anchor_y_offset: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeResponse {
    envelope_id: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: Option<String>,
}

#[derive(Clone)]
pub struct DocusignClient {
    client: Client,
    config: DocusignConfig,
}

struct Credentials<'a> {
    envelopes_url: String,
    access_token: &'a str,
}

impl DocusignClient {
    pub fn new(config: DocusignConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()?,
            config,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }

    fn credentials(&self) -> Result<Credentials<'_>, SignatureError> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .ok_or(SignatureError::NotConfigured("DOCUSIGN_BASE_URL"))?;
        let account_id = self
            .config
            .account_id
            .as_deref()
            .ok_or(SignatureError::NotConfigured("DOCUSIGN_ACCOUNT_ID"))?;
        let access_token = self
            .config
            .access_token
            .as_deref()
            .ok_or(SignatureError::NotConfigured("DOCUSIGN_ACCESS_TOKEN"))?;

        Ok(Credentials {
            envelopes_url: format!(
                "{}/{API_PREFIX}/{account_id}/envelopes",
                base_url.trim_end_matches('/')
            ),
            access_token,
        })
    }

    /// Turns a non-2xx response into `SignatureError::Api`.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SignatureError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ProviderErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or(body);
        Err(SignatureError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl SignatureProvider for DocusignClient {
    async fn create_envelope(
        &self,
        request: &EnvelopeRequest,
    ) -> Result<EnvelopeSummary, SignatureError> {
        let creds = self.credentials()?;

        let definition = EnvelopeDefinition {
            email_subject: &request.email_subject,
            documents: vec![Document {
                document_base64: BASE64.encode(request.document_html.as_bytes()),
                name: &request.document_name,
                file_extension: "html",
                document_id: "1",
            }],
            recipients: Recipients {
                signers: vec![Signer {
                    email: &request.signer_email,
                    name: &request.signer_name,
                    recipient_id: "1",
                    routing_order: "1",
                    tabs: Tabs {
                        sign_here_tabs: vec![SignHereTab {
                            anchor_string: SIGNATURE_ANCHOR,
                            anchor_units: "pixels",
                            anchor_x_offset: "0",
                            anchor_y_offset: "0",
                        }],
                    },
                }],
            },
            status: "sent",
        };

        let response = self
            .client
            .post(&creds.envelopes_url)
            .bearer_auth(creds.access_token)
            .json(&definition)
            .send()
            .await?;
        let body: EnvelopeResponse = Self::check(response).await?.json().await?;

        let envelope_id = body
            .envelope_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SignatureError::Parse("envelope response had no envelopeId".into()))?;

        info!(envelope_id = %envelope_id, "Envelope created");
        Ok(EnvelopeSummary {
            envelope_id,
            status: body.status.unwrap_or_else(|| "sent".to_string()),
        })
    }

    async fn envelope_status(&self, envelope_id: &str) -> Result<String, SignatureError> {
        let creds = self.credentials()?;
        let response = self
            .client
            .get(format!("{}/{envelope_id}", creds.envelopes_url))
            .bearer_auth(creds.access_token)
            .send()
            .await?;
        let body: EnvelopeResponse = Self::check(response).await?.json().await?;

        debug!(envelope_id, status = ?body.status, "Envelope status fetched");
        body.status
            .ok_or_else(|| SignatureError::Parse("envelope response had no status".into()))
    }

    async fn signed_document(&self, envelope_id: &str) -> Result<Bytes, SignatureError> {
        let creds = self.credentials()?;
        let response = self
            .client
            .get(format!("{}/{envelope_id}/documents/combined", creds.envelopes_url))
            .bearer_auth(creds.access_token)
            .send()
            .await?;
        Ok(Self::check(response).await?.bytes().await?)
    }
}
