//! Taskgate API server binary.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use taskgate_api::ApiConfig;
use tracing_subscriber::EnvFilter;

/// Log filter used when `RUST_LOG` is not set
const DEFAULT_LOG_FILTER: &str = "taskgate=info,taskgate_api=info,tower_http=info";

/// Taskgate - task tracking API with dependency gating
#[derive(Parser, Debug)]
#[command(name = "taskgate-api")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides the configuration file)
    #[arg(short, long, value_name = "ADDR")]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ApiConfig::load(path)
            .await
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => ApiConfig::default(),
    };
    if let Some(listen) = cli.listen {
        config.listen = listen;
        config.validate()?;
    }

    tracing::info!(listen = %config.listen, "Starting taskgate-api");
    taskgate_api::serve(config).await?;

    Ok(())
}
