//! Configuration types for the S3 store

use super::error::config_error;
use serde::{Deserialize, Serialize};
use skystash_store::TransferError;

/// S3 client configuration
///
/// Credentials are not part of the configuration: they come from the AWS default
/// credential chain (environment variables first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    /// AWS region (e.g., "us-west-2"); falls back to the default region chain
    pub region: Option<String>,

    /// Custom endpoint URL (for S3-compatible services like MinIO)
    pub endpoint: Option<String>,

    /// Path-style addressing (required for some S3-compatible services)
    pub force_path_style: bool,

    /// Per-operation timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            region: None,
            endpoint: None,
            force_path_style: false,
            timeout_seconds: 300,
        }
    }
}

impl S3Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.timeout_seconds == 0 {
            return Err(config_error("timeout_seconds must be at least 1"));
        }

        if let Some(endpoint) = &self.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(config_error(format!(
                    "endpoint must start with http:// or https://: {}",
                    endpoint
                )));
            }
        }

        if let Some(region) = &self.region {
            if region.trim().is_empty() {
                return Err(config_error("region cannot be empty"));
            }
        }

        Ok(())
    }

    /// Check if using custom endpoint (S3-compatible service)
    pub fn is_custom_endpoint(&self) -> bool {
        self.endpoint.is_some()
    }
}

/// Validate S3 bucket name according to AWS rules
pub fn is_valid_bucket_name(name: &str) -> bool {
    let len = name.len();

    // Length check: 3-63 characters
    if !(3..=63).contains(&len) {
        return false;
    }

    let bytes = name.as_bytes();
    let edge_ok = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    if !edge_ok(bytes[0]) || !edge_ok(bytes[len - 1]) {
        return false;
    }

    if !bytes
        .iter()
        .all(|&b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.')
    {
        return false;
    }

    if name.contains("..") {
        return false;
    }

    // Cannot be formatted as IP address
    if name.split('.').count() == 4 && name.split('.').all(|s| s.parse::<u8>().is_ok()) {
        return false;
    }

    !name.starts_with("xn--") && !name.ends_with("-s3alias")
}
