//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket. Messages are
//! JSON text frames with a `type` tag; tag values keep the event names the
//! original browser client speaks (`newId`, `dungeon data`, ...), but every
//! payload is an explicit tagged variant validated at the boundary before it
//! reaches game logic.
//!
//! Delivery is best-effort and at-most-once: no acknowledgments, no
//! retransmission, no replay. A client that misses a message recovers only
//! by reconnecting and receiving a fresh full snapshot.

use serde::{Deserialize, Serialize};

use crate::game::dungeon::{Dungeon, Point};
use crate::game::movement::Direction;
use crate::game::registry::PublicPlayer;

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Request to move one cell in a direction.
    #[serde(rename = "newCoordinates")]
    NewCoordinates {
        /// Requested direction.
        #[serde(rename = "move")]
        direction: Direction,
    },
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// The admitted player's stable id; sent once on admission.
    #[serde(rename = "newId")]
    NewId {
        /// Stable player id.
        id: u32,
    },

    /// Full dungeon snapshot; sent to a new connection on admission and to
    /// everyone on round transition.
    #[serde(rename = "dungeon data")]
    DungeonData {
        /// Complete grid + room metadata for the current round.
        dungeon: Dungeon,
        /// Spawn cell (center of the first room).
        #[serde(rename = "startingPoint")]
        starting_point: Point,
        /// Goal cell (center of the last room).
        #[serde(rename = "endingPoint")]
        ending_point: Point,
    },

    /// Full public roster; sent after any roster change.
    #[serde(rename = "getPlayers")]
    GetPlayers {
        /// All players in registry order.
        instance: Vec<PublicPlayer>,
    },

    /// Incremental update for one player after a successful non-goal move.
    #[serde(rename = "updatePlayers")]
    UpdatePlayers {
        /// The moved player's public fields.
        player: PublicPlayer,
    },

    /// A player left; clients splice `index` out of their roster mirror.
    ///
    /// Index-based rather than id-based for compatibility with the existing
    /// client: the removal must be applied before any later roster-indexed
    /// message, or client mirrors desynchronize. The game loop emits this
    /// immediately at removal time to keep that window closed.
    #[serde(rename = "removedPlayers")]
    RemovedPlayers {
        /// Registry index the player occupied at removal time.
        index: usize,
    },
}

impl ClientMessage {
    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a JSON text frame.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a JSON text frame.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
