//! Extraction Resolver: turns a resume reference into usable text.
//!
//! Inline text is used as-is. Storage references are parsed back into a bucket and
//! object key, downloaded, and dispatched by file extension to the vision service.
//! PDFs fall back to their local text layer when the vision service cannot help.

use bytes::Bytes;
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::capability::AiPermit;
use crate::errors::AppError;
use crate::llm_client::TextService;
use crate::storage::BlobStore;

/// Extracted text shorter than this (after trimming) cannot be evaluated.
pub const MIN_RESUME_TEXT_CHARS: usize = 50;

const FIREBASE_STORAGE_HOST: &str = "firebasestorage.googleapis.com";

/// Where a resume comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeSource {
    Inline(String),
    /// `s3://`, https object URL, or a bare key in the default bucket.
    Reference(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageObject {
    pub bucket: String,
    pub key: String,
}

/// Resume file formats the resolver can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Png,
    Jpeg,
    Webp,
    Gif,
    PlainText,
}

impl DocumentKind {
    pub fn from_key(key: &str) -> Option<Self> {
        let file_name = key.rsplit('/').next()?;
        let (_, ext) = file_name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "png" => Some(DocumentKind::Png),
            "jpg" | "jpeg" => Some(DocumentKind::Jpeg),
            "webp" => Some(DocumentKind::Webp),
            "gif" => Some(DocumentKind::Gif),
            "txt" => Some(DocumentKind::PlainText),
            _ => None,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Png => "image/png",
            DocumentKind::Jpeg => "image/jpeg",
            DocumentKind::Webp => "image/webp",
            DocumentKind::Gif => "image/gif",
            DocumentKind::PlainText => "text/plain",
        }
    }
}

/// Parses a storage reference into bucket and key.
///
/// `s3_endpoint` is the configured S3/MinIO endpoint; URLs on that host are read
/// path-style. Bare keys resolve against `default_bucket`.
pub fn parse_storage_reference(
    reference: &str,
    default_bucket: &str,
    s3_endpoint: &str,
) -> Option<StorageObject> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }

    if !reference.contains("://") {
        return object(default_bucket, reference.trim_start_matches('/'));
    }

    let url = Url::parse(reference).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    let path = url.path().trim_start_matches('/');

    match url.scheme() {
        "s3" => object(&host, path),
        "http" | "https" => {
            if host == FIREBASE_STORAGE_HOST {
                // /v0/b/<bucket>/o/<url-encoded key>
                let rest = path.strip_prefix("v0/b/")?;
                let (bucket, encoded_key) = rest.split_once("/o/")?;
                return object(bucket, encoded_key);
            }
            if let Some((bucket, _)) = host.split_once(".s3") {
                if host.ends_with(".amazonaws.com") && !bucket.is_empty() {
                    return object(bucket, path);
                }
            }
            if is_path_style_host(&url, &host, s3_endpoint) {
                let (bucket, key) = path.split_once('/')?;
                return object(bucket, key);
            }
            None
        }
        _ => None,
    }
}

fn is_path_style_host(url: &Url, host: &str, s3_endpoint: &str) -> bool {
    if host.starts_with("s3.") && host.ends_with(".amazonaws.com") {
        return true;
    }
    Url::parse(s3_endpoint).is_ok_and(|endpoint| {
        endpoint
            .host_str()
            .is_some_and(|h| h.eq_ignore_ascii_case(host))
            && endpoint.port_or_known_default() == url.port_or_known_default()
    })
}

fn object(bucket: &str, key: &str) -> Option<StorageObject> {
    let key = decode(key)?;
    if bucket.is_empty() || key.is_empty() {
        return None;
    }
    Some(StorageObject {
        bucket: bucket.to_string(),
        key,
    })
}

fn decode(raw: &str) -> Option<String> {
    urlencoding::decode(raw).ok().map(|s| s.into_owned())
}

/// Trims and enforces the minimum length. Too-short text is `InsufficientText`,
/// never a score.
pub fn ensure_sufficient(text: &str) -> Result<String, AppError> {
    let trimmed = text.trim();
    let chars = trimmed.chars().count();
    if chars < MIN_RESUME_TEXT_CHARS {
        return Err(AppError::InsufficientText(chars));
    }
    Ok(trimmed.to_string())
}

/// Borrowed view over the collaborators extraction needs.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    pub text_service: &'a dyn TextService,
    pub blobs: &'a dyn BlobStore,
    pub s3_endpoint: &'a str,
}

impl<'a> Resolver<'a> {
    /// Resolves a source to trimmed text of at least [`MIN_RESUME_TEXT_CHARS`].
    pub async fn resolve(
        &self,
        permit: &AiPermit,
        source: &ResumeSource,
    ) -> Result<String, AppError> {
        match source {
            ResumeSource::Inline(text) => ensure_sufficient(text),
            ResumeSource::Reference(reference) => {
                let object = parse_storage_reference(
                    reference,
                    self.blobs.default_bucket(),
                    self.s3_endpoint,
                )
                .ok_or_else(|| {
                    AppError::InvalidInput(format!("Unrecognised resume reference: {reference}"))
                })?;
                let text = self.extract_object(permit, &object).await?;
                ensure_sufficient(&text)
            }
        }
    }

    /// Downloads and reads one object. Unsupported extensions return empty text
    /// without touching storage or the vision service.
    pub async fn extract_object(
        &self,
        permit: &AiPermit,
        object: &StorageObject,
    ) -> Result<String, AppError> {
        let Some(kind) = DocumentKind::from_key(&object.key) else {
            debug!(key = %object.key, "Unsupported resume extension, skipping extraction");
            return Ok(String::new());
        };

        let bytes = self
            .blobs
            .download(&object.bucket, &object.key)
            .await
            .map_err(|e| AppError::ExtractionFailed(format!("{e:#}")))?;

        info!(
            bucket = %object.bucket,
            key = %object.key,
            size = bytes.len(),
            "Downloaded resume for extraction"
        );

        self.extract_bytes(permit, kind, bytes).await
    }

    async fn extract_bytes(
        &self,
        _permit: &AiPermit,
        kind: DocumentKind,
        bytes: Bytes,
    ) -> Result<String, AppError> {
        if kind == DocumentKind::PlainText {
            return Ok(String::from_utf8_lossy(&bytes).into_owned());
        }

        let from_service = self
            .text_service
            .extract_document_text(&bytes, kind.mime_type())
            .await;

        match (kind, from_service) {
            (DocumentKind::Pdf, Ok(text))
                if text.trim().chars().count() < MIN_RESUME_TEXT_CHARS =>
            {
                let local = pdf_text_layer(bytes).await.unwrap_or_default();
                Ok(if local.trim().len() > text.trim().len() { local } else { text })
            }
            (_, Ok(text)) => Ok(text),
            (DocumentKind::Pdf, Err(e)) => {
                warn!(error = %e, "Vision extraction failed, falling back to PDF text layer");
                pdf_text_layer(bytes)
                    .await
                    .ok_or_else(|| AppError::ExtractionFailed(format!("vision service: {e}")))
            }
            (_, Err(e)) => Err(AppError::ExtractionFailed(format!("vision service: {e}"))),
        }
    }
}

/// Reads a PDF's embedded text layer off the async runtime.
/// `None` when the PDF has no parsable text layer.
async fn pdf_text_layer(bytes: Bytes) -> Option<String> {
    let result =
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes)).await;
    match result {
        Ok(Ok(text)) => Some(text),
        Ok(Err(e)) => {
            debug!(error = %e, "PDF text layer unavailable");
            None
        }
        Err(e) => {
            warn!(error = %e, "PDF text layer extraction panicked");
            None
        }
    }
}
