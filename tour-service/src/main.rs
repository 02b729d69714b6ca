use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use tour_service::{
    config::Config,
    observability::{init_tracing, shutdown_tracing},
    routes::build_router,
    seed,
    server::Server,
    state::AppState,
};

/// Tour catalogue API
#[derive(Parser)]
#[command(name = "tour-service")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the search path
    #[arg(short, long, global = true, env = "TOURS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Import a JSON array of tours before serving
        #[arg(long, value_name = "FILE")]
        seed: Option<PathBuf>,
    },
    /// Load and print the effective configuration
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    match cli.command {
        Commands::Serve { seed } => serve(config, seed).await,
        Commands::CheckConfig => {
            let mut shown = config.clone();
            if shown.database.password.is_some() {
                shown.database.password = Some("********".to_string());
            }
            println!("{}", serde_json::to_string_pretty(&shown)?);
            Ok(())
        }
    }
}

async fn serve(config: Config, seed_file: Option<PathBuf>) -> anyhow::Result<()> {
    init_tracing(&config)?;

    let state = AppState::initialize(config.clone())
        .await
        .context("failed to initialize application state")?;

    if let Some(path) = seed_file {
        seed::import_file(state.tours(), &path)
            .await
            .with_context(|| format!("failed to import {}", path.display()))?;
    }

    let app = build_router(state);
    Server::new(config).serve(app).await?;

    shutdown_tracing();
    Ok(())
}
