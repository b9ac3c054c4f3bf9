//! WebSocket Game Server
//!
//! Accepts connections, performs the WebSocket handshake, and runs one read
//! task plus one write task per connection. Connection tasks never touch
//! game state: they validate wire messages at the boundary and forward
//! [`GameCommand`]s to the single-consumer game loop in
//! [`crate::network::sync`].

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::game::generator::{GenerationError, GeneratorConfig};
use crate::game::registry::ConnectionId;
use crate::game::round::RoundCoordinator;
use crate::network::protocol::{ClientMessage, ServerMessage};
use crate::network::sync::{GameCommand, GameWorld};
use crate::stats::{JsonlStatsSink, NullStatsSink, StatsError, StatsSink};

/// Server configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections; further handshakes are refused.
    pub max_connections: usize,
    /// Dungeon generation parameters.
    pub dungeon: GeneratorConfig,
    /// Base seed every round's dungeon derives from.
    pub base_seed: u64,
    /// Round stats file; `None` disables recording.
    pub stats_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8081".parse().unwrap(),
            max_connections: 64,
            dungeon: GeneratorConfig::default(),
            base_seed: 0,
            stats_path: None,
        }
    }
}

impl ServerConfig {
    /// Build the configuration from environment variables, falling back to
    /// defaults for anything unset. An unparseable value is a startup error;
    /// this is the only place the process is allowed to abort.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let dungeon = GeneratorConfig {
            width: parse_var("DUNGEON_WIDTH")?.unwrap_or(defaults.dungeon.width),
            height: parse_var("DUNGEON_HEIGHT")?.unwrap_or(defaults.dungeon.height),
            room_count: parse_var("DUNGEON_ROOMS")?.unwrap_or(defaults.dungeon.room_count),
            room_size: parse_var("DUNGEON_ROOM_SIZE")?.unwrap_or(defaults.dungeon.room_size),
        };
        dungeon
            .validate()
            .map_err(|e| ConfigError::InvalidDungeon(e.to_string()))?;

        // Without an explicit seed each server run gets a fresh dungeon
        // sequence; with one, the run is reproducible.
        let base_seed = match parse_var("DUNGEON_SEED")? {
            Some(seed) => seed,
            None => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .subsec_nanos() as u64,
        };

        Ok(Self {
            bind_addr: parse_var("BIND_ADDR")?.unwrap_or(defaults.bind_addr),
            max_connections: parse_var("MAX_CONNECTIONS")?.unwrap_or(defaults.max_connections),
            dungeon,
            base_seed,
            stats_path: std::env::var_os("STATS_PATH").map(PathBuf::from),
        })
    }
}

/// Parse an optional environment variable. A set-but-unreadable value is a
/// startup error, never a silent fallback to the default.
fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => parse_value(name, &raw).map(Some),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(raw)) => Err(ConfigError::InvalidValue {
            name,
            value: raw.to_string_lossy().into_owned(),
        }),
    }
}

/// Parse one configuration value, keeping the variable name for the error.
fn parse_value<T: FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: raw.to_string(),
    })
}

/// Startup configuration errors. These abort the process; nothing else does.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable holds an unparseable value.
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue {
        /// The offending variable.
        name: &'static str,
        /// Its raw value.
        value: String,
    },

    /// The dungeon parameters cannot describe a playable dungeon.
    #[error("invalid dungeon parameters: {0}")]
    InvalidDungeon(String),
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind the listen address.
    #[error("failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// The initial dungeon could not be generated.
    #[error("initial dungeon generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// The stats sink could not be opened.
    #[error("stats sink error: {0}")]
    Stats(#[from] StatsError),
}

/// The game server: owns the listener and the lifetime of the game loop.
pub struct GameServer {
    config: ServerConfig,
    connections: Arc<AtomicUsize>,
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            connections: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
        }
    }

    /// Run the server until shutdown is signalled.
    pub async fn run(&self) -> Result<(), GameServerError> {
        let stats: Arc<dyn StatsSink> = match &self.config.stats_path {
            Some(path) => Arc::new(JsonlStatsSink::open(path.clone()).await?),
            None => Arc::new(NullStatsSink),
        };

        let round = RoundCoordinator::new(self.config.dungeon, self.config.base_seed, stats)?;
        let (command_tx, command_rx) = mpsc::channel::<GameCommand>(256);
        let world_handle = tokio::spawn(GameWorld::new(round).run(command_rx));

        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("Dungeon server listening on {}", self.config.bind_addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.connections.load(Ordering::Relaxed) >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }
                            debug!("New connection from {}", addr);
                            self.handle_connection(stream, addr, command_tx.clone());
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        // Connection tasks see the shutdown signal, enqueue their
        // disconnects, and drop their command senders. Dropping ours lets
        // the game loop drain the queue and exit on its own.
        drop(command_tx);
        let _ = world_handle.await;

        Ok(())
    }

    /// Spawn the read/write tasks for one accepted connection.
    fn handle_connection(
        &self,
        stream: TcpStream,
        addr: SocketAddr,
        commands: mpsc::Sender<GameCommand>,
    ) {
        let connections = self.connections.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        connections.fetch_add(1, Ordering::Relaxed);

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    connections.fetch_sub(1, Ordering::Relaxed);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);
            let connection_id: ConnectionId = Uuid::new_v4();

            // Writer task: drains the game loop's messages onto the socket.
            let writer_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            // Admit the player. The game loop answers with newId, the
            // dungeon snapshot, and the roster.
            if commands
                .send(GameCommand::Connect {
                    connection_id,
                    sender: msg_tx,
                })
                .await
                .is_err()
            {
                // Game loop is gone; the server is shutting down.
                writer_task.abort();
                connections.fetch_sub(1, Ordering::Relaxed);
                return;
            }

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                match ClientMessage::from_json(&text) {
                                    Ok(ClientMessage::NewCoordinates { direction }) => {
                                        let _ = commands
                                            .send(GameCommand::Move { connection_id, direction })
                                            .await;
                                    }
                                    Err(e) => {
                                        // Malformed input never terminates a
                                        // connection; drop the frame.
                                        debug!("Invalid message from {}: {}", addr, e);
                                    }
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                debug!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            // Ping/pong handled by tungstenite; binary frames
                            // are not part of this protocol.
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }

            let _ = commands
                .send(GameCommand::Disconnect { connection_id })
                .await;
            writer_task.abort();
            connections.fetch_sub(1, Ordering::Relaxed);
        });
    }

    /// Signal the server to stop accepting and close all connections.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Active connection count.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8081);
        assert_eq!(config.max_connections, 64);
        assert_eq!(config.dungeon.width, 25);
        assert_eq!(config.dungeon.room_count, 25);
        assert!(config.stats_path.is_none());
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value::<i32>("DUNGEON_WIDTH", "30").unwrap(), 30);
        assert_eq!(
            parse_value::<SocketAddr>("BIND_ADDR", "127.0.0.1:9000")
                .unwrap()
                .port(),
            9000
        );

        match parse_value::<u32>("DUNGEON_ROOMS", "lots") {
            Err(ConfigError::InvalidValue { name, value }) => {
                assert_eq!(name, "DUNGEON_ROOMS");
                assert_eq!(value, "lots");
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_non_unicode_value_is_an_error() {
        use std::os::unix::ffi::OsStrExt;

        let name = "DUNGEON_TEST_NOT_UNICODE";
        std::env::set_var(name, std::ffi::OsStr::from_bytes(b"\xff\xfe"));

        match parse_var::<i32>(name) {
            Err(ConfigError::InvalidValue { name: got, .. }) => assert_eq!(got, name),
            other => panic!("expected InvalidValue, got {other:?}"),
        }

        std::env::remove_var(name);
    }

    #[tokio::test]
    async fn test_server_creation() {
        let server = GameServer::new(ServerConfig::default());
        assert_eq!(server.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_server_shutdown() {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        };
        let server = GameServer::new(config);
        server.shutdown();
        // Should not panic
    }

    #[tokio::test]
    async fn test_run_returns_after_shutdown() {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        };
        let server = std::sync::Arc::new(GameServer::new(config));

        let run_server = server.clone();
        let handle = tokio::spawn(async move { run_server.run().await });

        // Let run() bind and subscribe before signalling.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        server.shutdown();

        // The game loop drains and exits; run() must come back cleanly.
        let result = tokio::time::timeout(std::time::Duration::from_secs(2), handle)
            .await
            .expect("server did not stop after shutdown")
            .expect("server task panicked");
        assert!(result.is_ok());
    }
}
