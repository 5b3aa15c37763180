/*!
 * skystash - back up a local file tree to S3
 *
 * Each file is uploaded with a single request when it is at most the multipart
 * threshold (100 MiB by default), and as a sequential multipart upload otherwise.
 * Files are uploaded concurrently through a bounded worker pool.
 *
 * The same [`BackupJob`] backs the one-shot `skystash` binary and the
 * `skystash-daily` scheduler.
 */

pub mod backup;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod schedule;

// Re-export commonly used types
pub use backup::{spawn_reporter, BackupJob};
pub use config::{BackupConfig, ErrorPolicy, KeyMode, SourceConfig, TransferConfig, WalkErrorMode};
pub use self::core::{CompletionEvent, Dispatcher, RunReport, TransferStrategy};
pub use error::{Result, StashError};
pub use schedule::{DailyTrigger, Scheduler, Trigger};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
