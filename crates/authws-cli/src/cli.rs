//! CLI argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::OutputFormat;

/// authws CLI - synchronises the local directory with the student webservice.
#[derive(Debug, Parser)]
#[command(name = "authws")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (overrides the default location).
    #[arg(short, long, env = "AUTHWS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Local directory file (overrides config).
    #[arg(short, long, env = "AUTHWS_DIRECTORY")]
    pub directory: Option<PathBuf>,

    /// Output format (overrides config).
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a synchronisation pass.
    Sync(SyncArgs),

    /// Check a username and password against the webservice.
    Login(LoginArgs),

    /// List identities of the local directory.
    Users(UsersArgs),

    /// Configuration management.
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Sync arguments.
#[derive(Debug, clap::Args)]
pub struct SyncArgs {
    /// Compute and print the plan without changing the directory.
    #[arg(long)]
    pub dry_run: bool,

    /// Write the trace of the pass to a JSON file.
    #[arg(long)]
    pub trace: Option<PathBuf>,
}

/// Login arguments.
#[derive(Debug, clap::Args)]
pub struct LoginArgs {
    /// Username to check.
    pub username: String,

    /// Password (will prompt if not provided).
    #[arg(short, long)]
    pub password: Option<String>,
}

/// Users arguments.
#[derive(Debug, clap::Args)]
pub struct UsersArgs {
    /// Only list identities owned by this auth method.
    #[arg(short, long)]
    pub auth: Option<String>,

    /// Include suspended identities.
    #[arg(long)]
    pub suspended: bool,
}

/// Config commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,

    /// Print the configuration file path.
    Path,

    /// Initialize configuration interactively.
    Init,
}
