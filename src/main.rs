//! Kelly Leverage - Kelly criterion leverage service
//!
//! `kelly-leverage serve` runs the HTTP service, `kelly-leverage compute`
//! evaluates a single request from the terminal.

use anyhow::Result;

use kelly_leverage::adapters::cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (KELLY_HOST, KELLY_PORT, RUST_LOG, ...)
    dotenvy::dotenv().ok();

    let app = cli::init();
    cli::execute(app).await
}
