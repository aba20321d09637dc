mod commands;
mod images;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use promokit_client::PromoApiClient;
use promokit_flow::FileSessionStore;
use tracing_subscriber::EnvFilter;

use crate::commands::Context;

#[derive(Debug, Parser)]
#[command(name = "promokit")]
#[command(about = "Generate and publish promotion copy for a store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Upload images, encode the survey and generate ideas
    Generate {
        /// Survey answers as YAML
        #[arg(long)]
        form: PathBuf,
        /// Store image to upload (repeatable)
        #[arg(long = "image")]
        images: Vec<PathBuf>,
        /// Print ideas as JSON
        #[arg(long)]
        json: bool,
    },
    /// List ideas from the last generation
    Ideas {
        /// Print ideas as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replay the last generation request
    Regenerate {
        /// Print ideas as JSON
        #[arg(long)]
        json: bool,
    },
    /// Publish an idea from the last generation
    Publish {
        /// Idea id as shown by `ideas`
        idea_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = promokit_core::load_app_config_from_env()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!(?config, "configuration loaded");

    let client = PromoApiClient::from_config(&config)
        .map_err(|e| anyhow::anyhow!("failed to build API client: {e}"))?;
    let ctx = Context {
        store: Arc::new(FileSessionStore::new(config.state_dir.clone())),
        client: Arc::new(client),
        config,
    };

    match cli.command {
        Commands::Generate { form, images, json } => {
            commands::run_generate(&ctx, &form, &images, json).await
        }
        Commands::Ideas { json } => commands::run_ideas(&ctx, json),
        Commands::Regenerate { json } => commands::run_regenerate(&ctx, json).await,
        Commands::Publish { idea_id } => commands::run_publish(&ctx, &idea_id).await,
    }
}
