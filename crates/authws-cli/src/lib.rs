//! # authws-cli
//!
//! Command-line tools for authws.
//!
//! This crate provides command-line utilities for:
//! - Running a synchronisation pass against the webservice (or a dry run)
//! - Checking a username and password against the webservice
//! - Listing the identities of the local directory
//! - Managing the CLI configuration file

#![forbid(unsafe_code)]
#![deny(missing_docs)]
// Stylistic lints that fight the console output code
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::Cli;
pub use config::CliConfig;
pub use error::{CliError, CliResult};
