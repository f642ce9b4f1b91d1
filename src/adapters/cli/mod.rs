//! CLI Adapter
//!
//! Command-line interface for the Kelly leverage service.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{format_table, CliApp, Command, ComputeCmd, ServeCmd};

use anyhow::Result;

/// Parse the process arguments
pub fn init() -> CliApp {
    use clap::Parser;
    CliApp::parse()
}

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    commands::execute(app).await
}
