//! Movement Validation
//!
//! Pure geometry check for player move requests. Client input is untrusted,
//! so every requested step is validated here against the current dungeon
//! before any state changes. Free of side effects by design: the same
//! `(position, direction, dungeon)` always yields the same result, which
//! keeps the validator fuzzable in isolation from the network layer.

use serde::{Deserialize, Serialize};

use crate::game::dungeon::{Dungeon, Point};

/// A requested movement direction. One cell per move, no diagonals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Decrease y.
    Up,
    /// Increase y.
    Down,
    /// Decrease x.
    Left,
    /// Increase x.
    Right,
}

impl Direction {
    /// Unit cell offset for this direction.
    #[inline]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Facing change implied by this direction.
    ///
    /// Only horizontal moves turn the sprite; vertical moves keep whatever
    /// facing the player already had.
    #[inline]
    pub const fn facing_right(self) -> Option<bool> {
        match self {
            Direction::Right => Some(true),
            Direction::Left => Some(false),
            Direction::Up | Direction::Down => None,
        }
    }
}

/// Outcome of a validated move request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveResult {
    /// Move is legal; the player may occupy `position`.
    Moved {
        /// The new position (exactly one coordinate changed by one).
        position: Point,
        /// `Some` for horizontal moves, `None` to keep the current facing.
        facing_right: Option<bool>,
    },
    /// Target cell is a wall or out of bounds; nothing changes.
    Blocked,
}

/// Validate one step from `position` in `direction` against `dungeon`.
///
/// The candidate cell must be in bounds and walkable; there are no partial
/// moves. A blocked move carries no error detail because the only caller
/// reaction is to do nothing.
pub fn try_move(position: Point, direction: Direction, dungeon: &Dungeon) -> MoveResult {
    let (dx, dy) = direction.offset();
    let candidate = Point::new(position.x + dx, position.y + dy);

    if dungeon.walkable(candidate.x, candidate.y) {
        MoveResult::Moved {
            position: candidate,
            facing_right: direction.facing_right(),
        }
    } else {
        MoveResult::Blocked
    }
}

// =============================================================================
// TESTS
// =============================================================================
