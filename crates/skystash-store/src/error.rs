//! Error types for object-store operations

use std::io;
use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, TransferError>;

/// Errors raised by an object store or by a multipart session
#[derive(Error, Debug)]
pub enum TransferError {
    /// AWS SDK error that fits no other category
    #[error("AWS SDK error: {0}")]
    Sdk(String),

    /// Service error with a specific error code
    #[error("S3 service error ({code}): {message}")]
    Service { code: String, message: String },

    /// Connection, dispatch or response failure
    #[error("Network error: {0}")]
    Network(String),

    /// Bucket missing or not accessible
    #[error("Bucket not found or not accessible: {0}")]
    BucketNotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Credentials missing, expired or rejected
    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Multipart upload error: {0}")]
    MultipartUpload(String),

    /// A part was sent with an index other than the next one in sequence
    #[error("Part {got} out of order for {key}: expected part {expected}")]
    PartOutOfOrder { key: String, expected: i32, got: i32 },

    /// Completion was requested for a session without parts
    #[error("Refusing to complete multipart upload of {key} with no parts")]
    EmptyUpload { key: String },

    /// Reading the payload failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TransferError {
    /// Check whether the error came from reading local data rather than the store
    pub fn is_io(&self) -> bool {
        matches!(self, TransferError::Io(_))
    }
}
