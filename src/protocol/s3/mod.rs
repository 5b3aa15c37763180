//! Native S3 store for skystash
//!
//! Implements [`skystash_store::ObjectStore`] on top of the official AWS SDK for Rust.
//! Works against AWS S3 and S3-compatible services like MinIO.
//!
//! Credentials come from the default AWS provider chain, with the standard
//! environment variables taking precedence.
//!
//! # Example
//!
//! ```ignore
//! use skystash::protocol::s3::{S3Config, S3Store};
//! use skystash_store::{Acl, Bucket};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = S3Config {
//!         endpoint: Some("http://localhost:9000".to_string()),
//!         region: Some("us-east-1".to_string()), // Required even for MinIO
//!         force_path_style: true,
//!         ..Default::default()
//!     };
//!
//!     let store = Arc::new(S3Store::connect(&config).await?);
//!     let bucket = Bucket::new(store, "my-bucket");
//!     bucket.put("hello.txt", "hi".into(), "text/plain", Acl::Private).await?;
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod multipart;
mod operations;

#[cfg(test)]
mod tests;

pub use client::S3Store;
pub use config::{is_valid_bucket_name, S3Config};

/// Minimum multipart chunk size required by S3 (every part but the last)
pub const MIN_CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Maximum multipart chunk size (5 GB)
pub const MAX_CHUNK_SIZE: usize = 5 * 1024 * 1024 * 1024;
