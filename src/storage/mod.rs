use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::SourceMeta;

pub mod local;
pub mod s3;

pub type Resolver = Arc<dyn MetaResolver + Send + Sync>;
pub type Uploader = Arc<dyn ObjectUploader + Send + Sync>;

/// Produces the content and metadata of a transfer source from a manifest line.
#[async_trait]
pub trait MetaResolver {
    async fn resolve(&self, source_line: &str) -> Result<SourceMeta>;
}

/// Writes a resolved source to the destination bucket.
#[async_trait]
pub trait ObjectUploader {
    async fn upload(&self, key: &str, meta: SourceMeta) -> Result<()>;
}
