//! STW automation pilot - entry point.
//!
//! Runs the account automation orchestrator and the daily scheduler
//! until ctrl-c, then tears both down gracefully.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// STW account automation daemon
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via STW_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    stw_telemetry::init_logging()?;

    info!("Starting STW pilot v{}", env!("CARGO_PKG_VERSION"));

    // Determine config path: CLI arg > STW_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("STW_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");

    let config = stw_daemon::DaemonConfig::load(&config_path)?;
    info!(
        accounts = config.accounts.len(),
        api = %config.api.base_url,
        "Configuration loaded"
    );

    let app = stw_daemon::Application::new(config)?;
    app.run().await?;

    Ok(())
}
