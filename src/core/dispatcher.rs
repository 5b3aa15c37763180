/*!
 * Concurrent fan-out of upload tasks
 *
 * At most `concurrency` uploads are in flight at once. Finished uploads are
 * forwarded on the completion channel as they arrive; failures are handled
 * according to the configured [`ErrorPolicy`].
 */

use std::path::PathBuf;
use std::sync::Arc;

use skystash_store::Bucket;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinSet;
use tracing::{debug, error};

use super::classify::TransferStrategy;
use super::concurrency::resolve_concurrency;
use super::task::{run_upload, CompletionEvent};
use super::walk::SourceFile;
use crate::config::{ErrorPolicy, TransferConfig};
use crate::error::{Result, StashError};

/// One upload that failed under the continue policy
#[derive(Debug)]
pub struct FailedUpload {
    pub path: PathBuf,
    pub error: StashError,
}

/// Outcome of one dispatcher run
#[derive(Debug, Default)]
pub struct RunReport {
    /// Files handed to the dispatcher
    pub files: usize,
    pub uploaded: usize,
    pub bytes: u64,
    pub direct: usize,
    pub chunked: usize,
    pub failures: Vec<FailedUpload>,
}

impl RunReport {
    fn new(files: usize) -> Self {
        Self {
            files,
            ..Default::default()
        }
    }

    fn record(&mut self, event: &CompletionEvent) {
        self.uploaded += 1;
        self.bytes += event.bytes;
        match event.strategy {
            TransferStrategy::Direct => self.direct += 1,
            TransferStrategy::Chunked => self.chunked += 1,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Turn collected failures into a `Partial` error
    pub fn into_result(self) -> Result<Self> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(StashError::Partial {
                failed: self.failures.len(),
                total: self.files,
            })
        }
    }
}

/// Runs one upload task per file against a bucket
pub struct Dispatcher {
    bucket: Bucket,
    config: Arc<TransferConfig>,
    concurrency: usize,
}

impl Dispatcher {
    pub fn new(bucket: Bucket, config: TransferConfig) -> Self {
        let concurrency = resolve_concurrency(config.concurrency);
        Self {
            bucket,
            config: Arc::new(config),
            concurrency,
        }
    }

    /// Maximum number of uploads in flight
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Upload every file, forwarding each success on `events`
    ///
    /// Under [`ErrorPolicy::AbortAll`] the first failure cancels every in-flight
    /// upload and is returned; partially uploaded objects are not rolled back. Under
    /// [`ErrorPolicy::Continue`] all files are attempted and failures are collected in
    /// the report. A panicking upload task always fails the run.
    pub async fn run(
        &self,
        files: Vec<SourceFile>,
        events: &UnboundedSender<CompletionEvent>,
    ) -> Result<RunReport> {
        let mut report = RunReport::new(files.len());
        let mut pending = files.into_iter();
        let mut in_flight = JoinSet::new();

        debug!(
            bucket = self.bucket.name(),
            files = report.files,
            concurrency = self.concurrency,
            "dispatching uploads"
        );

        loop {
            while in_flight.len() < self.concurrency {
                let Some(file) = pending.next() else {
                    break;
                };
                let bucket = self.bucket.clone();
                let config = Arc::clone(&self.config);
                in_flight.spawn(async move {
                    let path = file.path.clone();
                    (path, run_upload(file, &bucket, &config).await)
                });
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };

            match joined {
                Ok((_, Ok(event))) => {
                    report.record(&event);
                    if events.send(event).is_err() {
                        debug!("completion receiver dropped");
                    }
                }
                Ok((path, Err(err))) => {
                    error!(
                        path = %path.display(),
                        category = %err.category(),
                        error = %err,
                        "upload failed"
                    );
                    match self.config.error_policy {
                        ErrorPolicy::AbortAll => {
                            in_flight.shutdown().await;
                            return Err(err);
                        }
                        ErrorPolicy::Continue => {
                            report.failures.push(FailedUpload { path, error: err });
                        }
                    }
                }
                Err(join_err) => {
                    in_flight.shutdown().await;
                    return Err(StashError::Join(join_err.to_string()));
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skystash_store::MemoryStore;
    use std::fs;
    use tempfile::{tempdir, TempDir};
    use tokio::sync::mpsc;

    fn tree(names: &[&str]) -> (TempDir, Vec<SourceFile>) {
        let dir = tempdir().unwrap();
        let files = names
            .iter()
            .map(|name| {
                let path = dir.path().join(name);
                fs::write(&path, name.as_bytes()).unwrap();
                SourceFile {
                    path,
                    key: name.to_string(),
                }
            })
            .collect();
        (dir, files)
    }

    fn dispatcher(store: &MemoryStore, policy: ErrorPolicy, concurrency: usize) -> Dispatcher {
        Dispatcher::new(
            Bucket::new(Arc::new(store.clone()), "b"),
            TransferConfig {
                concurrency,
                error_policy: policy,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_every_file_reported_once() {
        let (_dir, files) = tree(&["a", "b", "c", "d", "e"]);
        let store = MemoryStore::with_buckets(["b"]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let report = dispatcher(&store, ErrorPolicy::AbortAll, 2)
            .run(files, &tx)
            .await
            .unwrap();
        drop(tx);

        let mut keys = Vec::new();
        while let Some(event) = rx.recv().await {
            keys.push(event.key);
        }
        keys.sort();
        assert_eq!(keys, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(report.uploaded, 5);
        assert_eq!(report.direct, 5);
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn test_empty_file_list() {
        let store = MemoryStore::with_buckets(["b"]);
        let (tx, _rx) = mpsc::unbounded_channel();

        let report = dispatcher(&store, ErrorPolicy::AbortAll, 0)
            .run(Vec::new(), &tx)
            .await
            .unwrap();
        assert_eq!(report.files, 0);
        assert_eq!(report.uploaded, 0);
    }

    #[tokio::test]
    async fn test_abort_all_returns_first_error() {
        let (_dir, files) = tree(&["ok", "bad"]);
        let store = MemoryStore::with_buckets(["b"]);
        store.fail_key("bad");
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = dispatcher(&store, ErrorPolicy::AbortAll, 1)
            .run(files, &tx)
            .await
            .unwrap_err();
        assert!(matches!(err, StashError::Transfer { ref key, .. } if key == "bad"));
        assert_ne!(err.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_continue_collects_failures() {
        let (_dir, files) = tree(&["one", "two", "three"]);
        let store = MemoryStore::with_buckets(["b"]);
        store.fail_key("two");
        let (tx, _rx) = mpsc::unbounded_channel();

        let report = dispatcher(&store, ErrorPolicy::Continue, 3)
            .run(files, &tx)
            .await
            .unwrap();

        assert_eq!(report.uploaded, 2);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].path.ends_with("two"));

        let err = report.into_result().unwrap_err();
        assert!(matches!(err, StashError::Partial { failed: 1, total: 3 }));
    }

    #[test]
    fn test_auto_concurrency() {
        let store = MemoryStore::with_buckets(["b"]);
        assert!(dispatcher(&store, ErrorPolicy::AbortAll, 0).concurrency() >= 1);
        assert_eq!(dispatcher(&store, ErrorPolicy::AbortAll, 3).concurrency(), 3);
    }
}
