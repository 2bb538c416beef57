use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;

use crate::storage::BlobStore;

/// Object metadata key holding the token that authorises long-lived downloads.
const DOWNLOAD_TOKEN_METADATA: &str = "download-token";

/// S3 / MinIO blob store.
#[derive(Clone)]
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    fn default_bucket(&self) -> &str {
        &self.bucket
    }

    async fn download(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let object = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| anyhow!("S3 download of s3://{bucket}/{key} failed: {e}"))?;

        let data = object
            .body
            .collect()
            .await
            .map_err(|e| anyhow!("S3 body read of s3://{bucket}/{key} failed: {e}"))?;

        Ok(data.into_bytes())
    }

    async fn upload(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        download_token: &str,
    ) -> Result<()> {
        let size = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .metadata(DOWNLOAD_TOKEN_METADATA, download_token)
            .send()
            .await
            .map_err(|e| anyhow!("S3 upload failed: {e}"))?;

        info!("Uploaded {size} bytes to s3://{}/{}", self.bucket, key);
        Ok(())
    }

    async fn download_token(&self, key: &str) -> Result<Option<String>> {
        let head = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match head {
            Ok(output) => Ok(output
                .metadata()
                .and_then(|m| m.get(DOWNLOAD_TOKEN_METADATA))
                .cloned()),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(None),
            Err(e) => Err(anyhow!("S3 head of s3://{}/{key} failed: {e}", self.bucket)),
        }
    }
}
