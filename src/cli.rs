/*!
 * Command-line surface shared by `skystash` and `skystash-daily`
 */

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, ValueEnum};
use skystash_store::{Acl, ObjectStore};
use tracing::debug;

use crate::config::{BackupConfig, ErrorPolicy, KeyMode, LogLevel, WalkErrorMode};
use crate::error::{Result, StashError, EXIT_SUCCESS};
use crate::protocol::s3::{is_valid_bucket_name, S3Store};

/// Arguments common to both entry points
#[derive(Debug, Clone, Default, Args)]
pub struct CommonArgs {
    /// Local file or directory to back up
    #[arg(value_name = "SOURCE")]
    pub source: Option<PathBuf>,

    /// Destination bucket
    #[arg(value_name = "BUCKET")]
    pub bucket: Option<String>,

    /// TOML configuration file; flags override its values
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Maximum number of files uploaded at once (0 = auto)
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// What to do when one upload fails
    #[arg(long, value_enum)]
    pub error_policy: Option<ErrorPolicyArg>,

    /// How object keys are derived from file paths
    #[arg(long, value_enum)]
    pub key_mode: Option<KeyModeArg>,

    /// Handling of unreadable directory entries
    #[arg(long, value_enum)]
    pub walk_errors: Option<WalkErrorsArg>,

    /// Canned ACL for uploaded objects (private, public-read, bucket-owner-full-control, ...)
    #[arg(long, value_name = "ACL")]
    pub acl: Option<Acl>,

    /// AWS region
    #[arg(long)]
    pub region: Option<String>,

    /// Custom S3 endpoint URL (MinIO, LocalStack, ...)
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Use path-style bucket addressing
    #[arg(long)]
    pub force_path_style: bool,

    /// Log level
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevelArg>,

    /// Write JSON logs to this file instead of stderr
    #[arg(long = "log", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommonArgs {
    /// Source and bucket, or the configuration error naming what is missing
    pub fn require_paths(&self) -> Result<(PathBuf, String)> {
        let source = self
            .source
            .clone()
            .ok_or_else(|| StashError::Config("missing source and destination paths".to_string()))?;
        let bucket = self
            .bucket
            .clone()
            .ok_or_else(|| StashError::Config("missing destination path".to_string()))?;

        if !is_valid_bucket_name(&bucket) {
            return Err(StashError::Config(format!("invalid bucket name: {bucket}")));
        }
        Ok((source, bucket))
    }

    /// Load the configuration file, if any, and apply flag overrides
    pub fn resolve_config(&self) -> Result<BackupConfig> {
        let mut config = match &self.config {
            Some(path) => BackupConfig::from_file(path)?,
            None => BackupConfig::default(),
        };

        if let Some(concurrency) = self.concurrency {
            config.transfer.concurrency = concurrency;
        }
        if let Some(policy) = self.error_policy {
            config.transfer.error_policy = policy.into();
        }
        if let Some(acl) = self.acl {
            config.transfer.acl = acl;
        }
        if let Some(mode) = self.key_mode {
            config.source.key_mode = mode.into();
        }
        if let Some(mode) = self.walk_errors {
            config.source.walk_errors = mode.into();
        }
        if let Some(region) = &self.region {
            config.s3.region = Some(region.clone());
        }
        if let Some(endpoint) = &self.endpoint {
            config.s3.endpoint = Some(endpoint.clone());
        }
        if self.force_path_style {
            config.s3.force_path_style = true;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level.into();
        }
        if let Some(file) = &self.log_file {
            config.logging.file = Some(file.clone());
        }
        if self.verbose {
            config.logging.verbose = true;
        }

        Ok(config)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum ErrorPolicyArg {
    AbortAll,
    Continue,
}

impl From<ErrorPolicyArg> for ErrorPolicy {
    fn from(policy: ErrorPolicyArg) -> Self {
        match policy {
            ErrorPolicyArg::AbortAll => ErrorPolicy::AbortAll,
            ErrorPolicyArg::Continue => ErrorPolicy::Continue,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum KeyModeArg {
    Relative,
    FullPath,
}

impl From<KeyModeArg> for KeyMode {
    fn from(mode: KeyModeArg) -> Self {
        match mode {
            KeyModeArg::Relative => KeyMode::Relative,
            KeyModeArg::FullPath => KeyMode::FullPath,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum WalkErrorsArg {
    Skip,
    Abort,
}

impl From<WalkErrorsArg> for WalkErrorMode {
    fn from(mode: WalkErrorsArg) -> Self {
        match mode {
            WalkErrorsArg::Skip => WalkErrorMode::Skip,
            WalkErrorsArg::Abort => WalkErrorMode::Abort,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

/// Start the multi-threaded runtime used by both entry points
pub fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| StashError::Runtime(e.to_string()))
}

/// Connect to S3 with the configured client settings
pub async fn connect_store(config: &BackupConfig) -> Result<Arc<dyn ObjectStore>> {
    let store = S3Store::connect(&config.s3)
        .await
        .map_err(StashError::from_store)?;
    Ok(Arc::new(store))
}

/// Report the outcome of an entry point and turn it into a process exit code
pub fn exit_code(result: Result<()>) -> i32 {
    match result {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            debug!(category = %e.category(), error = %e, "run failed");
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        common: CommonArgs,
    }

    fn parse(args: &[&str]) -> CommonArgs {
        let mut argv = vec!["skystash"];
        argv.extend_from_slice(args);
        TestCli::try_parse_from(argv).unwrap().common
    }

    #[test]
    fn test_missing_paths() {
        let err = parse(&[]).require_paths().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: missing source and destination paths"
        );
        assert_eq!(err.exit_code(), 2);

        let err = parse(&["/data"]).require_paths().unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: missing destination path");
    }

    #[test]
    fn test_paths_and_bucket_validation() {
        let (source, bucket) = parse(&["/data", "my-backups"]).require_paths().unwrap();
        assert_eq!(source, PathBuf::from("/data"));
        assert_eq!(bucket, "my-backups");

        let err = parse(&["/data", "Bad_Bucket"]).require_paths().unwrap_err();
        assert!(matches!(err, StashError::Config(_)));
    }

    #[test]
    fn test_flag_overrides() {
        let args = parse(&[
            "/data",
            "bucket",
            "--concurrency",
            "3",
            "--error-policy",
            "continue",
            "--key-mode",
            "full-path",
            "--walk-errors",
            "abort",
            "--acl",
            "public-read",
            "--region",
            "eu-west-1",
            "--endpoint",
            "http://localhost:9000",
            "--force-path-style",
            "--log-level",
            "debug",
            "-v",
        ]);
        let config = args.resolve_config().unwrap();

        assert_eq!(config.transfer.concurrency, 3);
        assert_eq!(config.transfer.error_policy, ErrorPolicy::Continue);
        assert_eq!(config.transfer.acl, Acl::PublicRead);
        assert_eq!(config.source.key_mode, KeyMode::FullPath);
        assert_eq!(config.source.walk_errors, WalkErrorMode::Abort);
        assert_eq!(config.s3.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.s3.endpoint.as_deref(), Some("http://localhost:9000"));
        assert!(config.s3.force_path_style);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert!(config.logging.verbose);
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[transfer]\nconcurrency = 8\nerror_policy = \"continue\"\n[s3]\nregion = \"us-east-2\""
        )
        .unwrap();

        let path = file.path().to_str().unwrap();
        let config = parse(&["/data", "bucket", "--config", path, "--concurrency", "2"])
            .resolve_config()
            .unwrap();

        assert_eq!(config.transfer.concurrency, 2);
        assert_eq!(config.transfer.error_policy, ErrorPolicy::Continue);
        assert_eq!(config.s3.region.as_deref(), Some("us-east-2"));
    }

    #[test]
    fn test_invalid_acl_rejected_by_parser() {
        let argv = ["skystash", "/data", "bucket", "--acl", "world-writable"];
        assert!(TestCli::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_exit_code() {
        assert_eq!(exit_code(Ok(())), EXIT_SUCCESS);
        assert_eq!(exit_code(Err(StashError::Partial { failed: 1, total: 2 })), 1);
        assert_eq!(exit_code(Err(StashError::Config("x".to_string()))), 2);
    }
}
