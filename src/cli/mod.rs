//! Command line interface for kodegen_bundler_dmg.
//!
//! Parses arguments, runs the packaging command, and reports the outcome
//! as colored text or JSON.

mod args;
pub mod commands;
mod output;

pub use args::{Args, RuntimeConfig};
pub use commands::execute_command;
pub use output::OutputManager;

use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute_command(args).await
}
