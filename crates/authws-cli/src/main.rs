//! # authws CLI
//!
//! Command-line entry point for webservice synchronisation.

#![forbid(unsafe_code)]
#![allow(clippy::uninlined_format_args)]

use clap::Parser;
use authws_cli::{
    cli::{Cli, Command},
    commands::{run_config, run_login, run_sync, run_users},
    config::CliConfig,
    output::error,
    CliResult,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so command output stays parseable
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli).await {
        error(&e.to_string());
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => CliConfig::config_path()?,
    };
    let mut config = CliConfig::load_from(&config_path)?;
    let output_format = cli.output.unwrap_or(config.output_format);
    let directory = cli.directory.as_deref();

    match cli.command {
        Command::Sync(args) => run_sync(args, &config, directory, output_format).await,
        Command::Login(args) => run_login(args, &config).await,
        Command::Users(args) => run_users(&args, &config, directory, output_format),
        Command::Config(cmd) => run_config(&cmd, &mut config, &config_path),
    }
}
