//! Dungeon Generation
//!
//! Produces one [`Dungeon`] per round: rectangular rooms placed by rejection
//! sampling, then L-shaped corridors linking each room's center to the
//! previous room's center so the grid is connected from the first room to
//! the last.
//!
//! The generator is best-effort about the room count (a crowded grid simply
//! yields fewer rooms) but it must produce at least two: room 2 defines the
//! start point and the highest id defines the goal. Fewer than two is a
//! [`GenerationError::TooFewRooms`] and the caller decides what to do with
//! the previous dungeon.

use serde::{Deserialize, Serialize};

use crate::core::rng::DeterministicRng;
use crate::game::dungeon::{Dungeon, Room, CORRIDOR, FIRST_ROOM_ID, WALL};

/// Placement attempts per requested room before giving up on it.
const ATTEMPTS_PER_ROOM: u32 = 30;

/// Largest requestable room count; ids are `u16` values counted up from
/// [`FIRST_ROOM_ID`], so more rooms than this would wrap the id space.
const MAX_ROOM_COUNT: u32 = (u16::MAX - FIRST_ROOM_ID) as u32 + 1;

/// Parameters for dungeon generation, fixed at startup.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Grid size in the x dimension.
    pub width: i32,
    /// Grid size in the y dimension.
    pub height: i32,
    /// Approximate number of rooms to generate.
    pub room_count: u32,
    /// Rough room edge length; actual edges vary around this.
    pub room_size: i32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        // Matches the classic 25x25 dungeon the game shipped with.
        Self {
            width: 25,
            height: 25,
            room_count: 25,
            room_size: 5,
        }
    }
}

impl GeneratorConfig {
    /// Check that the parameters describe a generable dungeon.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.width < 5
            || self.height < 5
            || self.room_count < 2
            || self.room_count > MAX_ROOM_COUNT
            || self.room_size < 1
        {
            return Err(GenerationError::InvalidConfig {
                width: self.width,
                height: self.height,
                room_count: self.room_count,
                room_size: self.room_size,
            });
        }
        Ok(())
    }
}

/// Dungeon generation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Configuration cannot describe a playable dungeon.
    #[error("invalid generator config: {width}x{height}, {room_count} rooms of size {room_size}")]
    InvalidConfig {
        /// Requested grid width.
        width: i32,
        /// Requested grid height.
        height: i32,
        /// Requested room count.
        room_count: u32,
        /// Requested room size.
        room_size: i32,
    },

    /// Fewer than two rooms could be placed; start and goal are undefined.
    #[error("only {placed} room(s) could be placed, need at least 2")]
    TooFewRooms {
        /// Rooms that did fit.
        placed: usize,
    },
}

/// Generate a dungeon from the given configuration.
///
/// Deterministic for a given `(config, rng state)` pair.
pub fn generate(
    config: &GeneratorConfig,
    rng: &mut DeterministicRng,
) -> Result<Dungeon, GenerationError> {
    config.validate()?;

    let mut cells = vec![vec![WALL; config.width as usize]; config.height as usize];
    let mut rooms: Vec<Room> = Vec::new();

    // Room edges vary around room_size; clamp so a room always leaves the
    // one-cell wall border intact.
    let half = (config.room_size / 2).max(1);
    let max_dim = (config.room_size + half)
        .min(config.width - 2)
        .min(config.height - 2);
    let min_dim = (config.room_size - half).clamp(2, max_dim);

    for _ in 0..config.room_count {
        for _ in 0..ATTEMPTS_PER_ROOM {
            let w = rng.next_int_range(min_dim, max_dim);
            let h = rng.next_int_range(min_dim, max_dim);
            let x = rng.next_int_range(1, config.width - 1 - w);
            let y = rng.next_int_range(1, config.height - 1 - h);

            if !area_is_clear(&cells, x - 1, y - 1, w + 2, h + 2) {
                continue;
            }

            let id = FIRST_ROOM_ID + rooms.len() as u16;
            for row in cells.iter_mut().skip(y as usize).take(h as usize) {
                for cell in row.iter_mut().skip(x as usize).take(w as usize) {
                    *cell = id;
                }
            }

            rooms.push(Room {
                id,
                x,
                y,
                width: w,
                height: h,
                center_x: x + w / 2,
                center_y: y + h / 2,
            });
            break;
        }
    }

    if rooms.len() < 2 {
        return Err(GenerationError::TooFewRooms {
            placed: rooms.len(),
        });
    }

    // Link each room to its predecessor with an L-shaped corridor. Corridor
    // cells never overwrite room cells.
    for i in 1..rooms.len() {
        let from = rooms[i - 1].center();
        let to = rooms[i].center();

        if rng.coin() {
            carve_horizontal(&mut cells, from.x, to.x, from.y);
            carve_vertical(&mut cells, from.y, to.y, to.x);
        } else {
            carve_vertical(&mut cells, from.y, to.y, from.x);
            carve_horizontal(&mut cells, from.x, to.x, to.y);
        }
    }

    Ok(Dungeon {
        cells,
        width: config.width,
        height: config.height,
        rooms,
    })
}

/// Whether the rectangle contains only wall cells. Rooms are placed with a
/// one-cell margin inside the border, so the rectangle is always in bounds.
fn area_is_clear(cells: &[Vec<u16>], x: i32, y: i32, w: i32, h: i32) -> bool {
    for row in cells.iter().skip(y as usize).take(h as usize) {
        for cell in row.iter().skip(x as usize).take(w as usize) {
            if *cell != WALL {
                return false;
            }
        }
    }
    true
}

fn carve_horizontal(cells: &mut [Vec<u16>], x0: i32, x1: i32, y: i32) {
    let (lo, hi) = (x0.min(x1), x0.max(x1));
    for x in lo..=hi {
        let cell = &mut cells[y as usize][x as usize];
        if *cell == WALL {
            *cell = CORRIDOR;
        }
    }
}

fn carve_vertical(cells: &mut [Vec<u16>], y0: i32, y1: i32, x: i32) {
    let (lo, hi) = (y0.min(y1), y0.max(y1));
    for y in lo..=hi {
        let cell = &mut cells[y as usize][x as usize];
        if *cell == WALL {
            *cell = CORRIDOR;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn generate_seeded(seed: u64) -> Dungeon {
        let mut rng = DeterministicRng::new(seed);
        generate(&GeneratorConfig::default(), &mut rng).unwrap()
    }

    #[test]
    fn test_generation_determinism() {
        let a = generate_seeded(2024);
        let b = generate_seeded(2024);

        assert_eq!(a.cells, b.cells);
        assert_eq!(a.rooms, b.rooms);
    }

    #[test]
    fn test_room_ids_strictly_increasing_from_two() {
        for seed in 0..50 {
            let dungeon = generate_seeded(seed);
            for (i, room) in dungeon.rooms.iter().enumerate() {
                assert_eq!(room.id, FIRST_ROOM_ID + i as u16);
            }
        }
    }

    #[test]
    fn test_cell_invariant() {
        // Every cell is a wall, a corridor, or an id present in rooms.
        for seed in 0..50 {
            let dungeon = generate_seeded(seed);
            for row in &dungeon.cells {
                for &cell in row {
                    if cell >= FIRST_ROOM_ID {
                        assert!(dungeon.rooms.iter().any(|r| r.id == cell));
                    }
                }
            }
        }
    }

    #[test]
    fn test_start_and_end_walkable() {
        for seed in 0..50 {
            let dungeon = generate_seeded(seed);
            assert!(dungeon.room_count() >= 2);

            let start = dungeon.start_point().unwrap();
            let end = dungeon.end_point().unwrap();
            assert!(dungeon.walkable(start.x, start.y));
            assert!(dungeon.walkable(end.x, end.y));
        }
    }

    #[test]
    fn test_room_centers_carry_room_id() {
        for seed in 0..20 {
            let dungeon = generate_seeded(seed);
            for room in &dungeon.rooms {
                assert_eq!(dungeon.cell(room.center_x, room.center_y), Some(room.id));
            }
        }
    }

    #[test]
    fn test_goal_reachable_from_start() {
        // Corridors link consecutive rooms, so a walkable path must exist
        // from the start point to the goal.
        for seed in 0..20 {
            let dungeon = generate_seeded(seed);
            let start = dungeon.start_point().unwrap();
            let end = dungeon.end_point().unwrap();

            let mut seen = vec![vec![false; dungeon.width as usize]; dungeon.height as usize];
            let mut queue = VecDeque::from([start]);
            seen[start.y as usize][start.x as usize] = true;

            let mut reached = false;
            while let Some(p) = queue.pop_front() {
                if p == end {
                    reached = true;
                    break;
                }
                for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                    let (nx, ny) = (p.x + dx, p.y + dy);
                    if dungeon.walkable(nx, ny) && !seen[ny as usize][nx as usize] {
                        seen[ny as usize][nx as usize] = true;
                        queue.push_back(crate::game::dungeon::Point::new(nx, ny));
                    }
                }
            }
            assert!(reached, "seed {seed}: goal unreachable");
        }
    }

    #[test]
    fn test_too_few_rooms() {
        // A 5x5 grid fits one room at most.
        let config = GeneratorConfig {
            width: 5,
            height: 5,
            room_count: 5,
            room_size: 3,
        };

        let mut rng = DeterministicRng::new(7);
        match generate(&config, &mut rng) {
            Err(GenerationError::TooFewRooms { placed }) => assert!(placed < 2),
            other => panic!("expected TooFewRooms, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = GeneratorConfig {
            width: 0,
            height: 25,
            room_count: 25,
            room_size: 5,
        };

        let mut rng = DeterministicRng::new(1);
        assert!(matches!(
            generate(&config, &mut rng),
            Err(GenerationError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_room_count_capped_at_id_space() {
        // One past the largest id that still fits in u16 must be rejected;
        // the cap itself must pass validation.
        let config = GeneratorConfig {
            room_count: MAX_ROOM_COUNT + 1,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(GenerationError::InvalidConfig { .. })
        ));

        let config = GeneratorConfig {
            room_count: MAX_ROOM_COUNT,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
