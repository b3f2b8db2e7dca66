//! CLI module for dataapi
//!
//! Provides command-line interface for:
//! - serve: Start the HTTP server
//! - validate: Check a request against the quotas
//! - export: Write a request's content to a zip file

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{export, run, run_command, serve, validate, Config};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
