//! # Dungeon Server
//!
//! Authoritative game server for a cooperative maze race. Players share one
//! procedurally generated dungeon, race from its start room to its end room,
//! and the first to reach the goal rolls everyone into a fresh dungeon.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     DUNGEON SERVER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  └── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │                                                              │
//! │  game/           - Game logic (deterministic)                │
//! │  ├── dungeon.rs  - Grid, rooms, walkability queries          │
//! │  ├── generator.rs- Seeded room-and-corridor generation       │
//! │  ├── movement.rs - Pure movement validation                  │
//! │  ├── registry.rs - Player roster and public snapshots        │
//! │  └── round.rs    - Round lifecycle and regeneration          │
//! │                                                              │
//! │  network/        - Networking (non-deterministic)            │
//! │  ├── server.rs   - WebSocket server                          │
//! │  ├── protocol.rs - Message types                             │
//! │  └── sync.rs     - Single-consumer game loop                 │
//! │                                                              │
//! │  stats.rs        - Fire-and-forget round statistics          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Authority Model
//!
//! Clients send intents, never positions. Every mutation of shared state
//! flows through one game loop task, so no two commands ever interleave:
//! - Movement is validated against the current dungeon before it applies
//! - Broadcasts observe a consistent roster, never a half-applied one
//! - Dungeon regeneration is seeded; a fixed base seed replays a full run

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;
pub mod stats;

// Re-export commonly used types
pub use core::rng::{derive_round_seed, DeterministicRng};
pub use game::dungeon::{Dungeon, Point, Room};
pub use game::generator::GeneratorConfig;
pub use game::movement::{try_move, Direction, MoveResult};
pub use game::registry::{ConnectionId, PlayerRegistry, PublicPlayer};
pub use network::server::{GameServer, ServerConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
