use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum S3bulkError {
    #[error("payload has an invalid size")]
    InvalidSize,
    #[error("request returned a non-success status")]
    NotSuccessHttpStatus,
    #[error("mime type not recognized")]
    MimeTypeNotRecognized,
    #[error("acl mapping not implemented")]
    NotImplementedAclMapping,
    #[error("bucket \"{0}\" not found. consider --create-bucket")]
    BucketNotFound(String),
}
