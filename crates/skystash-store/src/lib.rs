//! skystash store interface: the object-store operations a backup run needs
//!
//! This crate defines the `ObjectStore` trait, which abstracts the remote side of a
//! backup so the transfer logic can run against AWS S3, an S3-compatible service, or
//! an in-memory store in tests.
//!
//! # Architecture
//!
//! - [`ObjectStore`]: the raw remote operations (bucket listing, single-shot put,
//!   multipart create/part/complete/abort). Implementations must be shareable
//!   across tasks.
//! - [`Bucket`]: a cheap handle binding a store to one bucket name.
//! - [`MultipartSession`]: one open multipart upload. It tracks its ordered parts and
//!   is finalized by `complete` or `abort`, both of which consume it.
//! - [`MemoryStore`]: an in-memory `ObjectStore` with failure injection.
//!
//! # Example
//!
//! ```rust
//! use skystash_store::{Acl, Bucket, MemoryStore};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> skystash_store::Result<()> {
//! let store = Arc::new(MemoryStore::with_buckets(["backups"]));
//! let bucket = Bucket::new(store.clone(), "backups");
//!
//! let mut session = bucket
//!     .init_multipart("disk.img", "application/octet-stream", Acl::Private)
//!     .await?;
//! let mut data: &[u8] = b"0123456789";
//! session.put_all(&mut data, 4).await?;
//! let done = session.complete().await?;
//!
//! assert_eq!(done.parts.len(), 3);
//! assert_eq!(&store.object("backups", "disk.img").unwrap().data[..], b"0123456789");
//! # Ok(())
//! # }
//! ```

mod bucket;
mod error;
mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

pub use bucket::{Bucket, CompletedUpload, MultipartSession};
pub use error::{Result, TransferError};
pub use memory::{CompletionRecord, MemoryStore, StoredObject};

/// Content type used for multipart uploads, whose payload is never sniffed
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Maximum number of parts in one multipart upload (S3 limit)
pub const MAX_PARTS: i32 = 10_000;

/// Canned access policy applied to uploaded objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Acl {
    #[default]
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
    BucketOwnerRead,
    BucketOwnerFullControl,
}

impl Acl {
    /// Wire name of the canned ACL
    pub fn as_str(&self) -> &'static str {
        match self {
            Acl::Private => "private",
            Acl::PublicRead => "public-read",
            Acl::PublicReadWrite => "public-read-write",
            Acl::AuthenticatedRead => "authenticated-read",
            Acl::BucketOwnerRead => "bucket-owner-read",
            Acl::BucketOwnerFullControl => "bucket-owner-full-control",
        }
    }
}

impl fmt::Display for Acl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Acl {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "private" => Ok(Acl::Private),
            "public-read" => Ok(Acl::PublicRead),
            "public-read-write" => Ok(Acl::PublicReadWrite),
            "authenticated-read" => Ok(Acl::AuthenticatedRead),
            "bucket-owner-read" => Ok(Acl::BucketOwnerRead),
            "bucket-owner-full-control" => Ok(Acl::BucketOwnerFullControl),
            other => Err(format!("unknown canned ACL: {other}")),
        }
    }
}

/// A bucket visible to the configured credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketInfo {
    pub name: String,
    pub created: Option<SystemTime>,
}

/// Remote descriptor of one uploaded part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartDescriptor {
    /// 1-based part index
    pub part_number: i32,

    /// Entity tag returned by the store, required to complete the upload
    pub etag: String,

    /// Payload size in bytes
    pub size: u64,
}

impl PartDescriptor {
    pub fn new(part_number: i32, etag: impl Into<String>, size: u64) -> Self {
        Self {
            part_number,
            etag: etag.into(),
            size,
        }
    }
}

/// Remote object-store operations
///
/// Implementations are shared read-only by every concurrent upload task, so they
/// must be `Send + Sync + 'static`. All methods take the bucket explicitly; use
/// [`Bucket`] for a bound handle.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// List the buckets visible to the current credentials
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>>;

    /// Create or overwrite an object in one request
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
        acl: Acl,
    ) -> Result<()>;

    /// Open a multipart upload and return its upload id
    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        acl: Acl,
    ) -> Result<String>;

    /// Upload one part of an open multipart upload
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<PartDescriptor>;

    /// Assemble the listed parts, in order, into the final object
    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[PartDescriptor],
    ) -> Result<()>;

    /// Discard an open multipart upload and its parts
    async fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()>;
}
