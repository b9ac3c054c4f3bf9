//! Dungeon Model
//!
//! Immutable-per-round cell grid plus room metadata. Built once by the
//! generator, owned by the round coordinator until the round ends, and
//! queried (never mutated) by movement validation and the sync layer.
//!
//! Cell values: `0` wall, `1` corridor, `n >= 2` the id of the room the
//! cell belongs to. Room ids are strictly increasing from 2 in generation
//! order, so the first room is always id 2 and the goal room is the
//! highest id.

use serde::{Deserialize, Serialize};

/// Cell value for impassable walls.
pub const WALL: u16 = 0;
/// Cell value for corridors connecting rooms.
pub const CORRIDOR: u16 = 1;
/// Id (and cell value) of the first generated room.
pub const FIRST_ROOM_ID: u16 = 2;

/// A cell coordinate in the dungeon grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Column (0 at the left edge).
    pub x: i32,
    /// Row (0 at the top edge).
    pub y: i32,
}

impl Point {
    /// Create a point.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A rectangular walkable region with a unique id >= 2.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    /// Room id; also the cell value of every cell inside the room.
    pub id: u16,
    /// Top-left corner column.
    pub x: i32,
    /// Top-left corner row.
    pub y: i32,
    /// Size in the x dimension.
    pub width: i32,
    /// Size in the y dimension.
    pub height: i32,
    /// Center column.
    pub center_x: i32,
    /// Center row.
    pub center_y: i32,
}

impl Room {
    /// The room's center cell.
    pub fn center(&self) -> Point {
        Point::new(self.center_x, self.center_y)
    }
}

/// Error returned by [`Dungeon::center_of`] for an unknown room id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no room with id {0}")]
pub struct RoomNotFound(pub u16);

/// The dungeon grid for one round.
///
/// Invariant: every in-bounds cell value is 0, 1, or an id present in
/// `rooms`. The struct serializes to the wire shape
/// `{cells, width, height, rooms}` sent inside `dungeon data`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dungeon {
    /// Row-major grid; `cells[y][x]`.
    pub cells: Vec<Vec<u16>>,
    /// Size in the x dimension.
    pub width: i32,
    /// Size in the y dimension.
    pub height: i32,
    /// Rooms in generation order, ids strictly increasing from 2.
    pub rooms: Vec<Room>,
}

impl Dungeon {
    /// Whether `(x, y)` lies inside the grid.
    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height
    }

    /// Cell value at `(x, y)`, or `None` when out of bounds.
    #[inline]
    pub fn cell(&self, x: i32, y: i32) -> Option<u16> {
        if self.in_bounds(x, y) {
            Some(self.cells[y as usize][x as usize])
        } else {
            None
        }
    }

    /// Whether a player may stand on `(x, y)`: in bounds and not a wall.
    #[inline]
    pub fn walkable(&self, x: i32, y: i32) -> bool {
        matches!(self.cell(x, y), Some(v) if v > WALL)
    }

    /// Center of the room with the given id.
    pub fn center_of(&self, room_id: u16) -> Result<Point, RoomNotFound> {
        self.rooms
            .iter()
            .find(|room| room.id == room_id)
            .map(Room::center)
            .ok_or(RoomNotFound(room_id))
    }

    /// Where players spawn: the center of the first generated room.
    pub fn start_point(&self) -> Result<Point, RoomNotFound> {
        self.center_of(FIRST_ROOM_ID)
    }

    /// The goal cell: the center of the last generated room.
    pub fn end_point(&self) -> Result<Point, RoomNotFound> {
        match self.rooms.last() {
            Some(room) => Ok(room.center()),
            None => Err(RoomNotFound(FIRST_ROOM_ID)),
        }
    }

    /// Number of rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

/// Handcrafted dungeons for unit tests across the crate.
#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A 10x10 dungeon with two single-cell rooms.
    ///
    /// Room 2 at (2,2), a corridor cell at (3,2), a wall at (4,2), and an
    /// L-shaped corridor down and across to room 3 at (7,7).
    pub(crate) fn two_rooms() -> Dungeon {
        let mut cells = vec![vec![WALL; 10]; 10];
        cells[2][2] = 2;
        cells[2][3] = CORRIDOR;
        for y in 3..=7 {
            cells[y][3] = CORRIDOR;
        }
        for x in 4..=6 {
            cells[7][x] = CORRIDOR;
        }
        cells[7][7] = 3;

        Dungeon {
            cells,
            width: 10,
            height: 10,
            rooms: vec![
                Room {
                    id: 2,
                    x: 2,
                    y: 2,
                    width: 1,
                    height: 1,
                    center_x: 2,
                    center_y: 2,
                },
                Room {
                    id: 3,
                    x: 7,
                    y: 7,
                    width: 1,
                    height: 1,
                    center_x: 7,
                    center_y: 7,
                },
            ],
        }
    }
}
