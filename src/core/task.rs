//! Per-file upload unit

use std::path::PathBuf;

use skystash_store::Bucket;
use tokio::fs::File;
use tokio::io::AsyncRead;
use tracing::info;

use super::chunked::ChunkedTransfer;
use super::classify::TransferStrategy;
use super::direct::DirectTransfer;
use super::walk::SourceFile;
use crate::config::TransferConfig;
use crate::error::{Result, StashError};

/// One file to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    pub source_path: PathBuf,
    pub destination_key: String,
    /// Size observed when the file was opened
    pub size: u64,
}

/// A file finished uploading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEvent {
    pub source_path: PathBuf,
    pub key: String,
    pub bytes: u64,
    pub strategy: TransferStrategy,
    /// Number of parts sent; 1 for direct uploads
    pub parts: usize,
}

impl UploadTask {
    pub fn new(source_path: impl Into<PathBuf>, destination_key: impl Into<String>, size: u64) -> Self {
        Self {
            source_path: source_path.into(),
            destination_key: destination_key.into(),
            size,
        }
    }

    /// Open and stat `file`
    pub async fn open(file: &SourceFile) -> Result<(Self, File)> {
        let handle = File::open(&file.path)
            .await
            .map_err(|e| StashError::io(&file.path, e))?;
        let size = handle
            .metadata()
            .await
            .map_err(|e| StashError::io(&file.path, e))?
            .len();

        Ok((Self::new(&file.path, &file.key, size), handle))
    }

    /// Strategy this task uses under `config`
    pub fn strategy(&self, config: &TransferConfig) -> TransferStrategy {
        TransferStrategy::classify(self.size, config.multipart_threshold)
    }

    /// Upload the contents of `reader` to `bucket`
    pub async fn execute<R>(
        &self,
        reader: &mut R,
        bucket: &Bucket,
        config: &TransferConfig,
    ) -> Result<CompletionEvent>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let key = self.destination_key.as_str();
        let strategy = self.strategy(config);
        info!(
            path = %self.source_path.display(),
            key,
            size = self.size,
            %strategy,
            "upload started"
        );

        let (bytes, parts) = match strategy {
            TransferStrategy::Direct => {
                let outcome = DirectTransfer::new(config.acl)
                    .run(bucket, key, reader, self.size)
                    .await
                    .map_err(|e| self.attribute(e))?;
                (outcome.bytes, 1)
            }
            TransferStrategy::Chunked => {
                let completed = ChunkedTransfer::new(config.chunk_size, config.acl)
                    .run(bucket, key, reader, self.size)
                    .await
                    .map_err(|e| self.attribute(e))?;
                (completed.bytes, completed.parts.len())
            }
        };

        info!(path = %self.source_path.display(), key, bytes, parts, "upload finished");

        Ok(CompletionEvent {
            source_path: self.source_path.clone(),
            key: self.destination_key.clone(),
            bytes,
            strategy,
            parts,
        })
    }

    fn attribute(&self, err: skystash_store::TransferError) -> StashError {
        StashError::from_transfer(&self.source_path, &self.destination_key, err)
    }
}

/// Open `file` and upload it to `bucket`
pub async fn run_upload(
    file: SourceFile,
    bucket: &Bucket,
    config: &TransferConfig,
) -> Result<CompletionEvent> {
    let (task, mut handle) = UploadTask::open(&file).await?;
    task.execute(&mut handle, bucket, config).await
}
