use std::fmt;
use std::fmt::{Debug, Formatter};

use anyhow::Error;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use zeroize_derive::{Zeroize, ZeroizeOnDrop};

pub mod error;

/// One transfer, created by the producer from a single manifest line.
/// Consumed exactly once by one worker and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub source_line: String,
    pub destination_key: String,
}

/// The access classification applied to an object at the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    Private,
    PublicRead,
    PublicReadWrite,
}

impl AccessPolicy {
    pub fn canned_acl(&self) -> ObjectCannedAcl {
        match self {
            AccessPolicy::Private => ObjectCannedAcl::Private,
            AccessPolicy::PublicRead => ObjectCannedAcl::PublicRead,
            AccessPolicy::PublicReadWrite => ObjectCannedAcl::PublicReadWrite,
        }
    }
}

/// Resolved source metadata. Owned exclusively by the worker that requested it
/// until the body has been fully consumed.
pub struct SourceMeta {
    pub body: ByteStream,
    pub size: i64,
    pub content_type: String,
    pub access_policy: AccessPolicy,
}

impl Debug for SourceMeta {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceMeta")
            .field("size", &self.size)
            .field("content_type", &self.content_type)
            .field("access_policy", &self.access_policy)
            .finish_non_exhaustive()
    }
}

/// Progress/error report sent by workers and the producer, consumed once by
/// the monitor.
#[derive(Debug)]
pub struct TransferMessage {
    pub info_text: String,
    pub source_line: String,
    pub error: Option<Error>,
}

impl TransferMessage {
    pub fn info(info_text: String) -> Self {
        Self {
            info_text,
            source_line: String::new(),
            error: None,
        }
    }

    pub fn error(source_line: String, error: Error) -> Self {
        Self {
            info_text: String::new(),
            source_line,
            error: Some(error),
        }
    }
}

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AccessKeys {
    pub access_key: String,
    pub secret_access_key: String,
}

impl Debug for AccessKeys {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut keys = f.debug_struct("AccessKeys");
        keys.field("access_key", &self.access_key)
            .field("secret_access_key", &"** redacted **");
        keys.finish()
    }
}
