use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use redis_migrator::config::Configuration;
use redis_migrator::migrator;

/// Copy all keys from one Redis instance to another.
#[derive(Parser, Debug)]
#[command(name = "redis-migrator", version, about)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the configured number of concurrent workers
    #[arg(long)]
    workers: Option<usize>,

    /// Clear each destination database before migrating into it
    #[arg(long)]
    clear: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let cancel = CancellationToken::new();
    let interrupt_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after in-flight keys");
            interrupt_token.cancel();
        }
    });

    match run(args, cancel).await {
        Ok(()) => {
            info!("migration completed");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("migration failed: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, cancel: CancellationToken) -> anyhow::Result<()> {
    let mut configuration = Configuration::load(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config.display()))?;

    if let Some(workers) = args.workers {
        configuration.workers = workers;
    }
    if args.clear {
        configuration.clear_destination = true;
    }

    migrator::migrate(&cancel, &configuration).await?;

    Ok(())
}
