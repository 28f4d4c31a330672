use anyhow::Result;
use clap::Parser;
use intent_refine::cli::{run, Cli};
use intent_refine::config::{AppConfig, DEFAULT_CONFIG_FILE};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up API keys from `.env` during local development
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = cli.load_config()?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match AppConfig::source_path(cli.config.as_deref()) {
        Some(path) => tracing::info!("Loaded configuration from {}", path.display()),
        None => tracing::info!("No {} found, using defaults", DEFAULT_CONFIG_FILE),
    }

    run(cli.command, config).await
}
