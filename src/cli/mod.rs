//! CLI module
//!
//! Command-line interface for harvesting offers.
//!
//! # Commands
//!
//! - `count` - Print the number of offers matching a query
//! - `fetch` - Write every matching offer as JSON

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
