use std::path::PathBuf;

use anyhow::Result;
use aura_backend::config::AppConfig;
use clap::Parser;
use log::info;

/// AURA backend server
#[derive(Parser)]
#[clap(name = "aura-server")]
#[clap(about = "REST backend for aflatoxin risk monitoring and batch certification")]
struct Args {
    /// Path to the TOML configuration file
    #[clap(long)]
    config: Option<PathBuf>,

    /// Port to listen on, overriding the configuration
    #[clap(long)]
    port: Option<u16>,

    /// Address to bind, overriding the configuration
    #[clap(long)]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }

    info!(
        "Starting AURA backend (storage: {:?}, ML: {})",
        config.storage.backend, config.ml.api_url
    );
    aura_backend::start_server(config).await
}
