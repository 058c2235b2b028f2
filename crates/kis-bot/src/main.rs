//! KIS trading CLI - Entry Point

use anyhow::Result;
use clap::Parser;
use kis_bot::{AppConfig, Application, Command};
use kis_telemetry::Metrics;
use tracing::info;

/// Command-line client for the Korea Investment & Securities trading API
#[derive(Parser, Debug)]
#[command(name = "kis", version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via KIS_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Print Prometheus metrics after the command
    #[arg(long, global = true)]
    dump_metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    kis_telemetry::init_logging()?;

    info!("Starting kis v{}", env!("CARGO_PKG_VERSION"));

    let config_path = AppConfig::resolve_path(args.config);
    info!(config_path = %config_path, "Loading configuration");
    let config = AppConfig::load(&config_path)?;
    info!(env = %config.session.env(), "Configuration loaded");

    let app = Application::connect(&config).await?;
    let output = app.execute(&args.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    app.finish();

    if args.dump_metrics {
        print!("{}", Metrics::render()?);
    }

    Ok(())
}
