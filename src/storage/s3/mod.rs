use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use url::Url;

use crate::storage::{MetaResolver, ObjectUploader};
use crate::types::error::S3bulkError;
use crate::types::SourceMeta;

pub mod acl;
pub mod client_builder;

/// Resolves manifest lines as objects in a source bucket.
pub struct RemoteObjectResolver {
    client: Arc<aws_sdk_s3::Client>,
    bucket: String,
}

impl RemoteObjectResolver {
    pub fn new(client: Arc<aws_sdk_s3::Client>, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl MetaResolver for RemoteObjectResolver {
    async fn resolve(&self, source_line: &str) -> Result<SourceMeta> {
        let key = object_key_from_line(source_line);

        let get_object_output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                anyhow!(e)
                    .context(S3bulkError::NotSuccessHttpStatus)
                    .context("aws_sdk_s3::client::get_object() failed.")
            })?;

        let size = get_object_output.content_length().unwrap_or_default();
        if size <= 0 {
            return Err(anyhow!(S3bulkError::InvalidSize)
                .context(format!("\"{key}\" has no content.")));
        }

        let reported_content_type = get_object_output
            .content_type()
            .unwrap_or_default()
            .to_string();

        // Placeholder content types are re-detected from the object's first
        // bytes. Buffering is required since a ByteStream is read-once.
        let (body, content_type) = if needs_sniffing(&reported_content_type) {
            let bytes = get_object_output
                .body
                .collect()
                .await
                .context("aws_smithy_types::byte_stream::ByteStream::collect() failed.")?
                .into_bytes();
            let sniffed = sniff_buffered_content_type(&bytes, &reported_content_type)
                .with_context(|| format!("failed to detect the content type of \"{key}\"."))?;
            (ByteStream::from(bytes), sniffed)
        } else {
            (get_object_output.body, reported_content_type)
        };

        let get_object_acl_output = self
            .client
            .get_object_acl()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .context("aws_sdk_s3::client::get_object_acl() failed.")?;

        let document = acl::document_from_acl_output(&get_object_acl_output);
        let access_policy = acl::map_access_policy(&document)
            .with_context(|| format!("failed to map the acl of \"{key}\"."))?;

        Ok(SourceMeta {
            body,
            size,
            content_type,
            access_policy,
        })
    }
}

/// Writes resolved sources to the destination bucket.
pub struct S3Uploader {
    client: Arc<aws_sdk_s3::Client>,
    bucket: String,
}

impl S3Uploader {
    pub fn new(client: Arc<aws_sdk_s3::Client>, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl ObjectUploader for S3Uploader {
    async fn upload(&self, key: &str, meta: SourceMeta) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_length(meta.size)
            .content_type(&meta.content_type)
            .acl(meta.access_policy.canned_acl())
            .body(meta.body)
            .send()
            .await
            .context("aws_sdk_s3::client::put_object() failed.")?;

        Ok(())
    }
}

pub async fn find_bucket(client: &aws_sdk_s3::Client, bucket: &str) -> Result<bool> {
    let list_buckets_output = client
        .list_buckets()
        .send()
        .await
        .context("aws_sdk_s3::client::list_buckets() failed.")?;

    Ok(list_buckets_output
        .buckets()
        .iter()
        .any(|candidate| candidate.name() == Some(bucket)))
}

pub async fn ensure_bucket(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    allow_create: bool,
) -> Result<()> {
    if find_bucket(client, bucket).await? {
        return Ok(());
    }

    if !allow_create {
        return Err(anyhow!(S3bulkError::BucketNotFound(bucket.to_string())));
    }

    client
        .create_bucket()
        .bucket(bucket)
        .send()
        .await
        .context("aws_sdk_s3::client::create_bucket() failed.")?;

    tracing::info!(bucket = bucket, "bucket created.");

    Ok(())
}

/// Extracts the object key from a manifest line. Lines may be full URLs or
/// bare keys, with or without a leading slash.
pub fn object_key_from_line(source_line: &str) -> String {
    let path = match Url::parse(source_line) {
        Ok(url) => url.path().to_string(),
        Err(_) => source_line.to_string(),
    };

    path.trim_start_matches('/').to_string()
}

fn needs_sniffing(content_type: &str) -> bool {
    content_type.is_empty() || content_type == "text/plain"
}

/// A reported "text/plain" survives a failed sniff since real text carries
/// no magic bytes. An empty report with no magic bytes is a hard failure.
fn sniff_buffered_content_type(bytes: &[u8], reported: &str) -> Result<String> {
    match infer::get(bytes) {
        Some(kind) => Ok(kind.mime_type().to_string()),
        None if reported.is_empty() => Err(anyhow!(S3bulkError::MimeTypeNotRecognized)),
        None => Ok(reported.to_string()),
    }
}
