//! CLI argument definitions using clap
//!
//! Commands:
//! - dataapi serve --config <path>
//! - dataapi validate --config <path> --page-ids <ids> [--whole-volumes]
//! - dataapi export --config <path> --page-ids <ids> --output <file> [--concat]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// dataapi - quota-checked bulk page and volume access
#[derive(Parser, Debug)]
#[command(name = "dataapi")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./dataapi.json")]
        config: PathBuf,
    },

    /// Check a request against the configured quotas without producing output
    Validate {
        /// Path to configuration file
        #[arg(long, default_value = "./dataapi.json")]
        config: PathBuf,

        /// `|`-separated page ids, e.g. `vol1[1,2]|vol2`
        #[arg(long)]
        page_ids: String,

        /// Count every id as its whole volume
        #[arg(long)]
        whole_volumes: bool,
    },

    /// Write the requested content to a zip file
    Export {
        /// Path to configuration file
        #[arg(long, default_value = "./dataapi.json")]
        config: PathBuf,

        /// `|`-separated page ids, e.g. `vol1[1,2]|vol2`
        #[arg(long)]
        page_ids: String,

        /// Output zip file
        #[arg(long)]
        output: PathBuf,

        /// Concatenate all pages into a single entry
        #[arg(long)]
        concat: bool,

        /// Export every id as its whole volume
        #[arg(long)]
        whole_volumes: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
