// autocommit CLI entry point.

use std::path::PathBuf;

use anyhow::Context;
use autocommit_daemon::config::{AutoCommitConfig, DEFAULT_CONFIG_FILE};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod exit_code;

use exit_code::ExitCode;

#[derive(Parser)]
#[command(
    name = "autocommit",
    about = "Watch a directory and periodically commit it to git",
    after_help = exit_code::EXIT_CODES_HELP
)]
struct Cli {
    /// Path to the `key=value` config file
    #[arg(default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::Success.into(),
        Err(err) => {
            error!("{err:#}");
            ExitCode::from_error(&err).into()
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    info!(path = %cli.config.display(), "loading config");
    let config = AutoCommitConfig::load_from(&cli.config)?;
    autocommit_daemon::runtime::run(config).await.context("autocommit terminated unexpectedly")
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
