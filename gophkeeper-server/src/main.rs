//! GophKeeper Sync Server
//!
//! A blind store for end-to-end encrypted secrets. The server persists
//! opaque ciphertexts with per-secret version counters and mediates
//! incremental sync between a user's devices -- it never possesses the
//! data-encryption key or any plaintext payload.

mod config;
mod error;
mod handlers;
mod middleware;
mod server;
mod service;
mod storage;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gophkeeper-server", about = "GophKeeper sync server")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "server.toml")]
    config: PathBuf,

    /// Listen address override
    #[arg(short, long)]
    listen: Option<String>,

    /// Database path override
    #[arg(short, long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    let mut cfg = if cli.config.exists() {
        config::ServerConfig::load(&cli.config)?
    } else {
        tracing::info!("No config file found, using defaults");
        config::ServerConfig::default()
    };
    cfg.apply_env();

    if let Some(listen) = cli.listen {
        cfg.listen_addr = listen;
    }
    if let Some(database) = cli.database {
        cfg.database_path = database;
    }

    tracing::info!("Starting GophKeeper server on {}", cfg.listen_addr);

    let storage = storage::Storage::open(&cfg.database_path)?;
    let state = server::AppState::new(storage, &cfg);
    let app = server::build_router(state, &cfg);

    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
