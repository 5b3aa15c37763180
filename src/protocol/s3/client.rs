//! S3 client implementation

use super::config::S3Config;
use super::error::{config_error, from_sdk};
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::Client as AwsS3Client;
use skystash_store::{BucketInfo, TransferError};
use std::time::Duration;
use std::time::SystemTime;
use tracing::debug;

/// Object store backed by AWS S3 or an S3-compatible service
#[derive(Clone)]
pub struct S3Store {
    /// AWS S3 client
    client: AwsS3Client,

    /// Client configuration
    config: S3Config,
}

impl std::fmt::Debug for S3Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Store")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl S3Store {
    /// Build a client from the configuration and the default credential chain
    ///
    /// Fails with `Authentication` when no credentials provider can be resolved.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use skystash::protocol::s3::{S3Config, S3Store};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let store = S3Store::connect(&S3Config::default()).await?;
    ///     for bucket in store.list_buckets().await? {
    ///         println!("{}", bucket.name);
    ///     }
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(config: &S3Config) -> Result<Self, TransferError> {
        config.validate()?;

        let client = Self::build_aws_client(config).await?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Build the AWS SDK S3 client from configuration
    async fn build_aws_client(config: &S3Config) -> Result<AwsS3Client, TransferError> {
        let mut aws_config_loader = aws_config::defaults(BehaviorVersion::latest());

        let region_provider = if let Some(region_str) = &config.region {
            RegionProviderChain::first_try(Region::new(region_str.clone()))
        } else {
            RegionProviderChain::default_provider()
        };
        aws_config_loader = aws_config_loader.region(region_provider);

        let aws_config = aws_config_loader.load().await;

        if aws_config.credentials_provider().is_none() {
            return Err(TransferError::Authentication(
                "no AWS credentials provider could be resolved".to_string(),
            ));
        }
        if aws_config.region().is_none() {
            return Err(config_error(
                "no AWS region configured; set --region or AWS_REGION",
            ));
        }

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&aws_config);

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        // Required for MinIO and LocalStack
        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let timeout_config = aws_sdk_s3::config::timeout::TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(config.timeout_seconds))
            .build();
        s3_config_builder = s3_config_builder.timeout_config(timeout_config);

        debug!(
            region = ?aws_config.region(),
            endpoint = ?config.endpoint,
            "built S3 client"
        );

        Ok(AwsS3Client::from_conf(s3_config_builder.build()))
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &S3Config {
        &self.config
    }

    /// Get a reference to the underlying AWS S3 client
    pub fn aws_client(&self) -> &AwsS3Client {
        &self.client
    }

    /// List the buckets owned by the authenticated account
    pub async fn list_buckets(&self) -> Result<Vec<BucketInfo>, TransferError> {
        let response = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| from_sdk(e, ""))?;

        Ok(response
            .buckets()
            .iter()
            .filter_map(|bucket| {
                let name = bucket.name()?.to_string();
                let created = bucket
                    .creation_date()
                    .and_then(|dt| SystemTime::try_from(*dt).ok());
                Some(BucketInfo { name, created })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_invalid_config() {
        let config = S3Config {
            timeout_seconds: 0,
            ..Default::default()
        };
        assert!(S3Store::connect(&config).await.is_err());
    }
}
