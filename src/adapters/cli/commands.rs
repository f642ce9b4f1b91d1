//! CLI Command Handlers
//!
//! `serve` runs the HTTP service, `compute` runs a single request from the
//! terminal against the configured quote source.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

use crate::adapters::http::{shutdown_signal, AppState, HttpServer};
use crate::adapters::yahoo::{YahooConfig, YahooQuoteSource};
use crate::application::KellyService;
use crate::config::{load_config, Config};
use crate::domain::{LeverageOutcome, LeverageResult, RawRequest};

/// Kelly - leverage per security from historical daily returns
#[derive(Parser, Debug)]
#[command(
    name = "kelly-leverage",
    version = env!("CARGO_PKG_VERSION"),
    about = "Kelly criterion leverage service",
    long_about = "Computes the Kelly-optimal leverage f = (m - r) / v for each security \
                  from the daily simple returns observed over a date range."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP service
    Serve(ServeCmd),

    /// Compute leverages once and print them
    Compute(ComputeCmd),
}

/// Run the HTTP service
#[derive(Parser, Debug)]
pub struct ServeCmd {
    /// Override listen host
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Override listen port
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,
}

/// One-off computation
#[derive(Parser, Debug)]
pub struct ComputeCmd {
    /// First day of the sampling period (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub start: String,

    /// Last day of the sampling period (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub end: String,

    /// Per-period risk-free rate (config default when omitted)
    #[arg(long, value_name = "RATE", allow_negative_numbers = true)]
    pub risk_free_rate: Option<f64>,

    /// Print the HTTP JSON response instead of a table
    #[arg(long)]
    pub json: bool,

    /// Ticker symbols
    #[arg(value_name = "SYMBOL", required = true)]
    pub symbols: Vec<String>,
}

impl ComputeCmd {
    pub fn to_request(&self) -> RawRequest {
        RawRequest {
            start_date: self.start.clone(),
            end_date: self.end.clone(),
            securities: self.symbols.clone(),
            risk_free_rate: self.risk_free_rate,
        }
    }
}

/// Execute the parsed command line
pub async fn execute(app: CliApp) -> Result<()> {
    let config = resolve_config(app.config.as_deref())?;
    init_logging(app.verbose, app.debug, &config.logging.level)?;

    match app.command {
        Command::Serve(cmd) => serve_command(cmd, config).await,
        Command::Compute(cmd) => compute_command(cmd, config).await,
    }
}

fn resolve_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// Initialize logging system. `RUST_LOG` wins over flags and config.
fn init_logging(verbose: bool, debug: bool, configured: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let fallback = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        configured
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

fn build_service(config: &Config) -> Result<KellyService> {
    let source = YahooQuoteSource::with_config(YahooConfig::from(&config.quote_source))
        .context("Failed to create quote source")?;
    Ok(KellyService::from_config(config, Arc::new(source)))
}

/// Handle serve command
async fn serve_command(cmd: ServeCmd, mut config: Config) -> Result<()> {
    if let Some(host) = cmd.host {
        config.server.host = host;
    }
    if let Some(port) = cmd.port {
        config.server.port = port;
    }

    let service = build_service(&config)?;
    let state = AppState::from_config(&config, service).context("Failed to load terms of service")?;

    tracing::info!(
        quote_source = state.service.source_name(),
        max_concurrency = config.pipeline.max_concurrency,
        request_timeout_secs = config.pipeline.request_timeout_secs,
        "Starting Kelly service"
    );

    HttpServer::new(config.server.bind_address(), Arc::new(state))
        .run_with_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Handle compute command
async fn compute_command(cmd: ComputeCmd, config: Config) -> Result<()> {
    let service = build_service(&config)?;

    // Ctrl+C stops pending securities; finished ones are still printed
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    let result = service.compute_with_cancel(&cmd.to_request(), cancel_rx).await;
    watcher.abort();
    let result = result.context("Invalid request")?;

    if cmd.json {
        let json = serde_json::to_string_pretty(&result.to_response())
            .context("Failed to serialize response")?;
        println!("{}", json);
    } else {
        print!("{}", format_table(&result));
    }

    Ok(())
}

/// One line per requested security: symbol, then leverage or failure reason
pub fn format_table(result: &LeverageResult) -> String {
    let width = result
        .iter()
        .map(|(security, _)| security.as_str().len())
        .max()
        .unwrap_or(0)
        .max("SYMBOL".len());

    let mut out = format!("{:<width$}  LEVERAGE\n", "SYMBOL");
    for (security, outcome) in result.iter() {
        let value = match outcome {
            LeverageOutcome::Computed(estimate) => format!("{:.4}", estimate.leverage),
            LeverageOutcome::Failed(failure) => format!("- ({})", failure),
        };
        out.push_str(&format!("{:<width$}  {}\n", security.as_str(), value));
    }
    out
}
