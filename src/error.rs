/*!
 * Error types for skystash
 */

use skystash_store::TransferError;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StashError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_FATAL: i32 = 2;

#[derive(Debug, Error)]
pub enum StashError {
    /// Missing or invalid arguments and configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential acquisition failed or credentials were rejected
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Local file could not be opened, stat'ed or read
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A remote operation for one object failed
    #[error("Upload of {key} failed: {source}")]
    Transfer {
        key: String,
        #[source]
        source: TransferError,
    },

    /// A remote operation not tied to one object failed (bucket listing)
    #[error("Object store error: {0}")]
    Store(#[source] TransferError),

    /// Some uploads of a run failed under the continue policy
    #[error("{failed} of {total} uploads failed")]
    Partial { failed: usize, total: usize },

    /// An upload task panicked or was cancelled unexpectedly
    #[error("Upload task failed: {0}")]
    Join(String),

    /// The async runtime could not be started
    #[error("Failed to start async runtime: {0}")]
    Runtime(String),
}

impl StashError {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        StashError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Attribute a transfer failure to the file and key it happened on
    ///
    /// Read failures surface as `Io`, credential failures as `Auth`, everything else
    /// as `Transfer`.
    pub fn from_transfer(path: &Path, key: &str, err: TransferError) -> Self {
        match err {
            TransferError::Io(source) => StashError::io(path, source),
            TransferError::Authentication(msg) => StashError::Auth(msg),
            source => StashError::Transfer {
                key: key.to_string(),
                source,
            },
        }
    }

    /// Map a store failure that has no file attached
    pub fn from_store(err: TransferError) -> Self {
        match err {
            TransferError::Authentication(msg) => StashError::Auth(msg),
            other => StashError::Store(other),
        }
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            StashError::Config(_) | StashError::Auth(_) | StashError::Runtime(_) => EXIT_FATAL,
            _ => EXIT_PARTIAL,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            StashError::Config(_) => ErrorCategory::Configuration,
            StashError::Auth(_) => ErrorCategory::Security,
            StashError::Io { .. } => ErrorCategory::IoError,
            StashError::Transfer { .. } | StashError::Store(_) => ErrorCategory::Network,
            StashError::Partial { .. } | StashError::Join(_) | StashError::Runtime(_) => {
                ErrorCategory::Concurrency
            }
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Security,
    IoError,
    Network,
    Concurrency,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Security => write!(f, "security"),
            ErrorCategory::IoError => write!(f, "io"),
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Concurrency => write!(f, "concurrency"),
        }
    }
}

impl From<toml::de::Error> for StashError {
    fn from(err: toml::de::Error) -> Self {
        StashError::Config(format!("TOML parse error: {}", err))
    }
}
