//! Player Registry
//!
//! Maps connection identity to player state and owns the join/leave
//! lifecycle. The registry is the sole mutator of player state; callers
//! serialize access through the single-consumer game loop, so there is no
//! internal locking.
//!
//! Players are kept in admission order because the wire protocol announces
//! disconnects by registry index (clients splice their local mirror).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::dungeon::Point;

/// Transient identity of one WebSocket connection. Lives exactly as long as
/// the connection; never sent to clients.
pub type ConnectionId = Uuid;

/// Authoritative state for one connected player.
#[derive(Clone, Debug)]
pub struct Player {
    /// Stable id, assigned monotonically and never reused within a server
    /// lifetime.
    pub id: u32,
    /// Owning connection.
    pub connection_id: ConnectionId,
    /// Column in the dungeon grid. Always a walkable cell.
    pub x: i32,
    /// Row in the dungeon grid. Always a walkable cell.
    pub y: i32,
    /// Whether the client should play the walking animation.
    pub is_moving: bool,
    /// Client-side sprite frame cursor; the server carries it but never
    /// advances it.
    pub animation_frame_index: u32,
    /// Sprite facing; flipped by horizontal moves only.
    pub facing_right: bool,
}

impl Player {
    /// Position as a point.
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    fn public(&self) -> PublicPlayer {
        PublicPlayer {
            x: self.x,
            y: self.y,
            is_moving: self.is_moving,
            animation_frame_index: self.animation_frame_index,
            facing_right: self.facing_right,
            id: self.id,
        }
    }
}

/// Player fields safe to broadcast: everything except the connection id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPlayer {
    /// Column in the dungeon grid.
    pub x: i32,
    /// Row in the dungeon grid.
    pub y: i32,
    /// Walking animation flag.
    pub is_moving: bool,
    /// Sprite frame cursor.
    pub animation_frame_index: u32,
    /// Sprite facing.
    pub facing_right: bool,
    /// Stable player id.
    pub id: u32,
}

/// Ordered collection of connected players.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: Vec<Player>,
    next_id: u32,
}

impl PlayerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a new connection as a player at the given start point.
    ///
    /// Ids count up from 1 and are never reused, independent of how many
    /// players are currently connected.
    pub fn admit(&mut self, connection_id: ConnectionId, start: Point) -> &Player {
        self.next_id += 1;
        self.players.push(Player {
            id: self.next_id,
            connection_id,
            x: start.x,
            y: start.y,
            is_moving: false,
            animation_frame_index: 0,
            facing_right: true,
        });
        self.players.last().expect("player was just pushed")
    }

    /// Remove the player bound to `connection_id`, returning the registry
    /// index it occupied. A connection that is not present (disconnect
    /// racing a queued message) is a silent no-op.
    pub fn remove(&mut self, connection_id: ConnectionId) -> Option<usize> {
        let index = self
            .players
            .iter()
            .position(|p| p.connection_id == connection_id)?;
        self.players.remove(index);
        Some(index)
    }

    /// Look up a player by connection.
    pub fn get(&self, connection_id: ConnectionId) -> Option<&Player> {
        self.players
            .iter()
            .find(|p| p.connection_id == connection_id)
    }

    /// Apply a validated move to one player. No-op (returns `None`) if the
    /// connection has already gone away.
    ///
    /// `facing_right` is `Some` only for horizontal moves; `None` keeps the
    /// player's current facing.
    pub fn apply_move(
        &mut self,
        connection_id: ConnectionId,
        position: Point,
        facing_right: Option<bool>,
    ) -> Option<PublicPlayer> {
        let player = self
            .players
            .iter_mut()
            .find(|p| p.connection_id == connection_id)?;

        player.x = position.x;
        player.y = position.y;
        player.is_moving = true;
        if let Some(facing) = facing_right {
            player.facing_right = facing;
        }
        Some(player.public())
    }

    /// Move every player to `start` (round transition).
    pub fn reset_all_to(&mut self, start: Point) {
        for player in &mut self.players {
            player.x = start.x;
            player.y = start.y;
            player.is_moving = false;
        }
    }

    /// Public projection of all players, in registry order.
    pub fn snapshot_public(&self) -> Vec<PublicPlayer> {
        self.players.iter().map(Player::public).collect()
    }

    /// Number of connected players.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const START: Point = Point::new(2, 2);

    #[test]
    fn test_admit_defaults() {
        let mut registry = PlayerRegistry::new();
        let conn = Uuid::new_v4();

        let player = registry.admit(conn, START);
        assert_eq!(player.id, 1);
        assert_eq!((player.x, player.y), (2, 2));
        assert!(!player.is_moving);
        assert_eq!(player.animation_frame_index, 0);
        assert!(player.facing_right);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_ids_never_reused() {
        let mut registry = PlayerRegistry::new();
        let first = Uuid::new_v4();

        assert_eq!(registry.admit(first, START).id, 1);
        assert_eq!(registry.admit(Uuid::new_v4(), START).id, 2);

        registry.remove(first);
        // A new admission continues the counter, it does not back-fill.
        assert_eq!(registry.admit(Uuid::new_v4(), START).id, 3);
    }

    #[test]
    fn test_remove_returns_index() {
        let mut registry = PlayerRegistry::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        registry.admit(a, START);
        registry.admit(b, START);

        assert_eq!(registry.remove(a), Some(0));
        // b shifted down to index 0
        assert_eq!(registry.remove(b), Some(0));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut registry = PlayerRegistry::new();
        registry.admit(Uuid::new_v4(), START);

        assert_eq!(registry.remove(Uuid::new_v4()), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_apply_move_unknown_connection() {
        let mut registry = PlayerRegistry::new();
        registry.admit(Uuid::new_v4(), START);

        let result = registry.apply_move(Uuid::new_v4(), Point::new(3, 2), Some(true));
        assert!(result.is_none());

        // Nothing moved
        let snapshot = registry.snapshot_public();
        assert_eq!((snapshot[0].x, snapshot[0].y), (2, 2));
    }

    #[test]
    fn test_apply_move_updates_fields() {
        let mut registry = PlayerRegistry::new();
        let conn = Uuid::new_v4();
        registry.admit(conn, START);

        let updated = registry
            .apply_move(conn, Point::new(1, 2), Some(false))
            .unwrap();
        assert_eq!((updated.x, updated.y), (1, 2));
        assert!(updated.is_moving);
        assert!(!updated.facing_right);

        // Vertical move keeps facing
        let updated = registry.apply_move(conn, Point::new(1, 3), None).unwrap();
        assert!(!updated.facing_right);
    }

    #[test]
    fn test_snapshot_strips_connection_identity() {
        let mut registry = PlayerRegistry::new();
        registry.admit(Uuid::new_v4(), START);

        let json = serde_json::to_value(registry.snapshot_public()).unwrap();
        let entry = &json[0];
        assert!(entry.get("connectionId").is_none());
        assert!(entry.get("connection_id").is_none());
        assert_eq!(entry["id"], 1);
        assert_eq!(entry["isMoving"], false);
        assert_eq!(entry["animationFrameIndex"], 0);
        assert_eq!(entry["facingRight"], true);
    }

    #[test]
    fn test_reset_all_to() {
        let mut registry = PlayerRegistry::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        registry.admit(a, START);
        registry.admit(b, START);
        registry.apply_move(a, Point::new(5, 6), Some(true));

        registry.reset_all_to(Point::new(1, 1));
        for player in registry.snapshot_public() {
            assert_eq!((player.x, player.y), (1, 1));
            assert!(!player.is_moving);
        }
    }
}
