//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Harvest job offers from the France Travail offers API
#[derive(Parser, Debug)]
#[command(name = "ft-offers")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// OAuth2 client id (overrides FT_CLIENT_ID and the config file)
    #[arg(long, global = true)]
    pub client_id: Option<String>,

    /// OAuth2 client secret (overrides FT_CLIENT_SECRET and the config file)
    #[arg(long, global = true)]
    pub client_secret: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print how many offers match a query
    Count {
        /// Search filter as key=value (repeatable)
        #[arg(short, long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },

    /// Fetch every offer matching a query
    Fetch {
        /// Search filter as key=value (repeatable)
        #[arg(short, long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Look-back in days when no minCreationDate is given
        #[arg(long)]
        max_creation_days: Option<i64>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,

        /// Stop after this many offers
        #[arg(long)]
        max_records: Option<usize>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One offer per line
    Json,
    /// Indented JSON, one offer after the other
    Pretty,
}
