/*!
 * Configuration types for skystash
 */

use crate::core::classify::{DEFAULT_CHUNK_SIZE, DEFAULT_MULTIPART_THRESHOLD};
use crate::error::{Result, StashError};
use crate::protocol::s3::{S3Config, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use skystash_store::Acl;
use std::path::{Path, PathBuf};

/// Main configuration for backup runs
///
/// Every section and field is optional in the TOML file; missing values take the
/// defaults below. Command-line flags are applied on top by the CLI layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    pub transfer: TransferConfig,
    pub source: SourceConfig,
    pub s3: S3Config,
    pub logging: LoggingConfig,
    pub schedule: ScheduleConfig,
}

/// How files are moved to the bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Files strictly larger than this many bytes use a multipart upload
    pub multipart_threshold: u64,

    /// Part size for multipart uploads, in bytes
    pub chunk_size: usize,

    /// Maximum number of files uploaded at once (0 = auto-detect)
    pub concurrency: usize,

    /// What to do when one file fails
    pub error_policy: ErrorPolicy,

    /// Canned ACL applied to every uploaded object
    pub acl: Acl,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            multipart_threshold: DEFAULT_MULTIPART_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
            concurrency: 0,
            error_policy: ErrorPolicy::default(),
            acl: Acl::default(),
        }
    }
}

impl TransferConfig {
    /// Check the invariants every store relies on
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(StashError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.multipart_threshold < self.chunk_size as u64 {
            return Err(StashError::Config(format!(
                "multipart_threshold ({}) must not be smaller than chunk_size ({})",
                self.multipart_threshold, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Behaviour of a run when one upload fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Cancel every in-flight upload and fail the run on the first error
    #[default]
    AbortAll,

    /// Let every upload finish and report failures together
    Continue,
}

/// How discovered files are turned into object keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum KeyMode {
    /// Path relative to the source root, `/`-separated
    #[default]
    Relative,

    /// The full source path as given, `/`-separated
    FullPath,
}

/// Handling of unreadable entries during the directory walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WalkErrorMode {
    /// Log a warning and keep walking
    #[default]
    Skip,

    /// Fail the run before any upload starts
    Abort,
}

/// Source enumeration settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub key_mode: KeyMode,
    pub walk_errors: WalkErrorMode,
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,

    /// Log file path (None = stderr)
    pub file: Option<PathBuf>,

    /// Shorthand for level = debug
    pub verbose: bool,
}

/// Daily trigger settings for `skystash-daily`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Local wall-clock time of the daily run, `HH:MM`
    pub at: String,

    /// Run once immediately before waiting for the first trigger
    pub run_on_start: bool,

    /// Stop the scheduler after the first failed run
    pub stop_on_failure: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            at: "00:00".to_string(),
            run_on_start: false,
            stop_on_failure: false,
        }
    }
}

impl ScheduleConfig {
    /// Parse `at` into a wall-clock time
    pub fn at_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(self.at.trim(), "%H:%M").map_err(|e| {
            StashError::Config(format!("invalid schedule time {:?} (expected HH:MM): {}", self.at, e))
        })
    }
}

impl BackupConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            StashError::Config(format!(
                "cannot read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: BackupConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Validate everything needed for a run against S3
    pub fn validate(&self) -> Result<()> {
        self.transfer.validate()?;

        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&self.transfer.chunk_size) {
            return Err(StashError::Config(format!(
                "chunk_size {} is outside the S3 part size limits [{}, {}]",
                self.transfer.chunk_size, MIN_CHUNK_SIZE, MAX_CHUNK_SIZE
            )));
        }

        self.s3
            .validate()
            .map_err(|e| StashError::Config(e.to_string()))?;
        self.schedule.at_time()?;
        Ok(())
    }
}
