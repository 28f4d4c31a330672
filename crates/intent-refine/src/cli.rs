//! Command-line interface: serve the API, warm the index cache, or rank a
//! transcript offline.

use crate::api::{ApiConfig, ApiServer};
use crate::config::AppConfig;
use crate::retrieval::{IndexCache, VectorizerParams};
use crate::service::{load_index, RefineService};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Voice-command intent classifier
#[derive(Debug, Parser)]
#[command(name = "intent-refine")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "TF-IDF candidate retrieval with LLM disambiguation for voice commands")]
pub struct Cli {
    /// Path to the config file (defaults to ./intent-refine.toml when present)
    #[arg(short, long, global = true, env = "INTENT_REFINE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Override the bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the bind port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Build (or verify) the cached retrieval index and exit
    Index,

    /// Print the top candidates for a transcript without calling the model
    Rank {
        /// Transcript to rank
        text: String,

        /// Number of rows to consider
        #[arg(short, default_value_t = 3)]
        k: usize,
    },
}

impl Cli {
    /// Load configuration, applying command-line overrides
    pub fn load_config(&self) -> Result<AppConfig> {
        let mut config =
            AppConfig::load_from(self.config.as_deref()).context("Failed to load configuration")?;

        if let Commands::Serve { host, port } = &self.command {
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
        }

        Ok(config)
    }
}

/// Execute a parsed command against a loaded configuration
pub async fn run(command: Commands, config: AppConfig) -> Result<()> {
    match command {
        Commands::Serve { .. } => serve(config).await,
        Commands::Index => {
            let (store, index, status) = load_index(&config)?;
            let fingerprint =
                IndexCache::fingerprint(&store, &VectorizerParams::from(&config.retrieval))?;
            let path = IndexCache::new(&config.retrieval.cache_dir).path_for(&fingerprint);
            tracing::info!(
                intents = store.intent_count(),
                examples = store.example_count(),
                vocabulary = index.vectorizer().vocabulary_size(),
                status = ?status,
                "Index ready"
            );
            println!("{}", path.display());
            Ok(())
        }
        Commands::Rank { text, k } => {
            let (_, index, _) = load_index(&config)?;
            let candidates = index.rank(&text, k);
            println!("{}", serde_json::to_string_pretty(&candidates)?);
            Ok(())
        }
    }
}

async fn serve(config: AppConfig) -> Result<()> {
    let service = RefineService::from_config(&config)?;
    tracing::info!(
        provider = %config.model.provider,
        intents = service.intent_count(),
        examples = service.example_count(),
        top_k = service.top_k(),
        "Service initialized"
    );

    let server = ApiServer::new(ApiConfig::from(&config.server), service);
    server.run_with_shutdown(shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
