use std::path::Path;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use tokio::io::AsyncReadExt;

use crate::storage::MetaResolver;
use crate::types::error::S3bulkError;
use crate::types::{AccessPolicy, SourceMeta};

const SNIFF_BUFFER_SIZE: usize = 8192;

/// Resolves manifest lines as paths on the local filesystem.
pub struct LocalFileResolver {
    mime_from_extension: bool,
}

impl LocalFileResolver {
    pub fn new(mime_from_extension: bool) -> Self {
        Self {
            mime_from_extension,
        }
    }

    async fn resolve_content_type(&self, path: &Path) -> Result<String> {
        if self.mime_from_extension {
            return mime_guess::from_path(path)
                .first()
                .map(|mime| mime.to_string())
                .ok_or_else(|| {
                    anyhow!(S3bulkError::MimeTypeNotRecognized)
                        .context(format!("no mime type for extension of \"{}\".", path.display()))
                });
        }

        sniff_content_type(path).await
    }
}

#[async_trait]
impl MetaResolver for LocalFileResolver {
    async fn resolve(&self, source_line: &str) -> Result<SourceMeta> {
        let path = Path::new(source_line);

        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("failed to open \"{}\".", path.display()))?;

        if !metadata.is_file() {
            return Err(anyhow!(S3bulkError::InvalidSize)
                .context(format!("\"{}\" is not a regular file.", path.display())));
        }
        if metadata.len() == 0 {
            return Err(anyhow!(S3bulkError::InvalidSize)
                .context(format!("\"{}\" is empty.", path.display())));
        }

        let content_type = self.resolve_content_type(path).await?;

        let body = ByteStream::from_path(path)
            .await
            .with_context(|| format!("failed to open \"{}\".", path.display()))?;

        Ok(SourceMeta {
            body,
            size: metadata.len() as i64,
            content_type,
            access_policy: AccessPolicy::PublicRead,
        })
    }
}

async fn sniff_content_type(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open \"{}\".", path.display()))?;

    let mut buffer = vec![0u8; SNIFF_BUFFER_SIZE];
    let read = file
        .read(&mut buffer)
        .await
        .with_context(|| format!("failed to read \"{}\".", path.display()))?;
    buffer.truncate(read);

    if let Some(kind) = infer::get(&buffer) {
        return Ok(kind.mime_type().to_string());
    }

    // Plain text carries no magic bytes. Fall back to the extension, then
    // classify readable text as text/plain.
    if let Some(mime) = mime_guess::from_path(path).first() {
        return Ok(mime.to_string());
    }

    if std::str::from_utf8(&buffer).is_ok() {
        return Ok(mime_guess::mime::TEXT_PLAIN.to_string());
    }

    Err(anyhow!(S3bulkError::MimeTypeNotRecognized)
        .context(format!("unrecognized content of \"{}\".", path.display())))
}
