/*!
 * skystash-daily - back up a file tree to an S3 bucket once a day
 *
 * Arguments are read once at startup; the same source and bucket are used for
 * every run.
 */

use clap::Parser;
use skystash::{
    cli::{self, CommonArgs},
    logging, BackupJob, DailyTrigger, Result, Scheduler, StashError,
};
use skystash_store::TransferError;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "skystash-daily")]
#[command(version, about = "Back up a local file or directory to an S3 bucket every day", long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Local time of the daily run (HH:MM)
    #[arg(long, value_name = "HH:MM")]
    at: Option<String>,

    /// Run once immediately, then daily
    #[arg(long)]
    run_now: bool,
}

fn main() {
    let code = cli::exit_code(run());
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let (source, bucket) = cli.common.require_paths()?;
    let mut config = cli.common.resolve_config()?;
    if let Some(at) = cli.at {
        config.schedule.at = at;
    }
    if cli.run_now {
        config.schedule.run_on_start = true;
    }
    config.validate()?;
    let at = config.schedule.at_time()?;

    if let Err(e) = logging::init_logging(&config.logging) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let runtime = cli::build_runtime()?;
    runtime.block_on(async {
        let store = cli::connect_store(&config).await?;

        match store.list_buckets().await {
            Ok(buckets) => {
                let names: Vec<&str> = buckets.iter().map(|b| b.name.as_str()).collect();
                info!(buckets = ?names, "available buckets");
                if !names.contains(&bucket.as_str()) {
                    warn!(bucket = %bucket, "destination bucket not found in bucket listing");
                }
            }
            // Upload-only credentials often cannot list buckets
            Err(TransferError::AccessDenied(msg)) => {
                warn!(error = %msg, "not allowed to list buckets");
            }
            Err(e) => return Err(StashError::from_store(e)),
        }

        let job = BackupJob::from_config(store, &config)?;
        info!(source = %source.display(), bucket = %bucket, %at, "daily backup scheduled");

        Scheduler::new(job, DailyTrigger::new(at))
            .run_on_start(config.schedule.run_on_start)
            .stop_on_failure(config.schedule.stop_on_failure)
            .run(&source, &bucket)
            .await?;
        Ok(())
    })
}
