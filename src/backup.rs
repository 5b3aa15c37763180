//! One backup run: walk the source, dispatch uploads, report completions
//!
//! [`BackupJob`] is shared by the one-shot `skystash` binary and the daily
//! scheduler. It holds the store and the settings; the source root and bucket
//! are given per run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use skystash_store::{Bucket, ObjectStore};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::{BackupConfig, SourceConfig, TransferConfig};
use crate::core::{collect_files, CompletionEvent, Dispatcher, RunReport};
use crate::error::{Result, StashError};

/// Reusable backup unit
#[derive(Clone)]
pub struct BackupJob {
    store: Arc<dyn ObjectStore>,
    transfer: TransferConfig,
    source: SourceConfig,
}

impl std::fmt::Debug for BackupJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupJob")
            .field("transfer", &self.transfer)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl BackupJob {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        transfer: TransferConfig,
        source: SourceConfig,
    ) -> Result<Self> {
        transfer.validate()?;
        Ok(Self {
            store,
            transfer,
            source,
        })
    }

    pub fn from_config(store: Arc<dyn ObjectStore>, config: &BackupConfig) -> Result<Self> {
        Self::new(store, config.transfer.clone(), config.source)
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Back up `source` into `bucket`, sending one event per uploaded file
    ///
    /// Failures collected under the continue policy are left in the report; use
    /// [`RunReport::into_result`] to turn them into an error.
    pub async fn run_once(
        &self,
        source: &Path,
        bucket: &str,
        events: &UnboundedSender<CompletionEvent>,
    ) -> Result<RunReport> {
        let started = Instant::now();

        let root = source.to_path_buf();
        let source_config = self.source;
        let files = tokio::task::spawn_blocking(move || collect_files(&root, &source_config))
            .await
            .map_err(|e| StashError::Join(e.to_string()))??;

        let dispatcher = Dispatcher::new(
            Bucket::new(Arc::clone(&self.store), bucket),
            self.transfer.clone(),
        );
        let report = dispatcher.run(files, events).await?;

        info!(
            source = %source.display(),
            bucket,
            files = report.files,
            uploaded = report.uploaded,
            failed = report.failures.len(),
            direct = report.direct,
            chunked = report.chunked,
            bytes = report.bytes,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "backup run finished"
        );
        Ok(report)
    }

    /// [`run_once`](Self::run_once) with a stdout reporter attached
    pub async fn run(&self, source: &Path, bucket: &str) -> Result<RunReport> {
        let (tx, rx) = mpsc::unbounded_channel();
        let reporter = spawn_reporter(rx);

        let result = self.run_once(source, bucket, &tx).await;
        drop(tx);
        reporter
            .await
            .map_err(|e| StashError::Join(e.to_string()))?;

        result
    }
}

/// Print `Done uploading: <path>` for every completion until the senders are gone
///
/// Resolves to the paths reported, in arrival order.
pub fn spawn_reporter(mut events: UnboundedReceiver<CompletionEvent>) -> JoinHandle<Vec<PathBuf>> {
    tokio::spawn(async move {
        let mut done = Vec::new();
        while let Some(event) = events.recv().await {
            println!("Done uploading: {}", event.source_path.display());
            done.push(event.source_path);
        }
        done
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use skystash_store::MemoryStore;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_run_reports_every_file() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::write(dir.path().join("sub/b.txt"), b"b").unwrap();

        let store = MemoryStore::with_buckets(["b"]);
        let job = BackupJob::new(
            Arc::new(store.clone()),
            TransferConfig::default(),
            SourceConfig::default(),
        )
        .unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        let reporter = spawn_reporter(rx);
        let report = job.run_once(dir.path(), "b", &tx).await.unwrap();
        drop(tx);

        let mut done = reporter.await.unwrap();
        done.sort();
        assert_eq!(
            done,
            vec![dir.path().join("a.txt"), dir.path().join("sub/b.txt")]
        );
        assert_eq!(report.uploaded, 2);
        assert_eq!(store.object_keys("b"), vec!["a.txt", "sub/b.txt"]);
    }

    #[tokio::test]
    async fn test_missing_source_is_config_error() {
        let store = MemoryStore::with_buckets(["b"]);
        let job = BackupJob::new(
            Arc::new(store),
            TransferConfig::default(),
            SourceConfig::default(),
        )
        .unwrap();

        let err = job
            .run(Path::new("/no/such/source/dir"), "b")
            .await
            .unwrap_err();
        assert!(matches!(err, StashError::Config(_)));
    }

    #[test]
    fn test_invalid_transfer_config_rejected() {
        let transfer = TransferConfig {
            chunk_size: 0,
            ..Default::default()
        };
        let err = BackupJob::new(
            Arc::new(MemoryStore::new()),
            transfer,
            SourceConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, StashError::Config(_)));
    }
}
