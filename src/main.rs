/*!
 * skystash - one-shot backup of a file tree to an S3 bucket
 */

use clap::Parser;
use skystash::{
    cli::{self, CommonArgs},
    logging, BackupJob, Result,
};

#[derive(Parser)]
#[command(name = "skystash")]
#[command(version, about = "Back up a local file or directory to an S3 bucket", long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
}

fn main() {
    let code = cli::exit_code(run());
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Argument errors are reported before anything touches the network
    let (source, bucket) = cli.common.require_paths()?;
    let config = cli.common.resolve_config()?;
    config.validate()?;

    if let Err(e) = logging::init_logging(&config.logging) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let runtime = cli::build_runtime()?;
    runtime.block_on(async {
        let store = cli::connect_store(&config).await?;
        let job = BackupJob::from_config(store, &config)?;
        job.run(&source, &bucket).await?.into_result()?;
        Ok(())
    })
}
