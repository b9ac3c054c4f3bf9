//! Network layer: wire protocol, WebSocket server, and the game loop that
//! serializes all state mutation.

pub mod protocol;
pub mod server;
pub mod sync;

pub use protocol::{ClientMessage, ServerMessage};
pub use server::{ConfigError, GameServer, GameServerError, ServerConfig};
pub use sync::{GameCommand, GameWorld};
