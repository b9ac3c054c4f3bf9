//! Dungeon Server
//!
//! Authoritative maze-race server. Loads configuration from the
//! environment, then serves the WebSocket protocol until Ctrl-C.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dungeon_server::{GameServer, ServerConfig, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env().context("invalid configuration")?;

    info!("Dungeon Server v{}", VERSION);
    info!(
        "Dungeon: {}x{}, {} rooms of size {}",
        config.dungeon.width, config.dungeon.height, config.dungeon.room_count, config.dungeon.room_size
    );
    info!("Base seed: {}", config.base_seed);

    let server = Arc::new(GameServer::new(config));

    let shutdown_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
            shutdown_server.shutdown();
        }
    });

    server.run().await.context("server error")?;

    Ok(())
}
