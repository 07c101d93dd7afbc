//! Chatrelay daemon

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use chatrelay::config::{Config, Credentials};
use chatrelay::error::Result;
use chatrelay::relay::{AppState, RelayServer};

/// Chatrelay - streams chat, image, vision and speech requests to AI providers
#[derive(Parser)]
#[command(name = "chatrelay")]
#[command(about = "An HTTP relay that forwards front-end requests to hosted AI providers")]
#[command(version)]
pub struct Cli {
    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Path to a dotenv file with provider keys
    #[arg(long, global = true, default_value = ".env")]
    pub env_file: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the relay server (default command)
    #[command(name = "serve")]
    Serve,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => serve(cli.config, cli.env_file).await,
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,chatrelay=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(config_path: Option<PathBuf>, env_file: PathBuf) -> Result<()> {
    tracing::info!("Starting chatrelay");

    match dotenv::from_path(&env_file) {
        Ok(()) => tracing::info!("Loaded environment from {}", env_file.display()),
        Err(e) => tracing::warn!("Error loading {}: {e}", env_file.display()),
    }

    let mut config = Config::load(config_path)?;
    config.apply_env(|key| std::env::var(key).ok());
    tracing::debug!("Config loaded: {:?}", config);

    let credentials = Credentials::from_env();
    tracing::debug!("Credentials: {:?}", credentials);

    let state = AppState::new(config, credentials)?;
    RelayServer::new(state).serve().await?;

    tracing::info!("Chatrelay stopped");
    Ok(())
}
