//! Game logic: dungeon model, generation, movement validation, player
//! registry, and the round state machine.
//!
//! Everything in this module is synchronous and lock-free; the network
//! layer's single-consumer game loop serializes all mutation.

pub mod dungeon;
pub mod generator;
pub mod movement;
pub mod registry;
pub mod round;

pub use dungeon::{Dungeon, Point, Room};
pub use generator::{GenerationError, GeneratorConfig};
pub use movement::{try_move, Direction, MoveResult};
pub use registry::{ConnectionId, Player, PlayerRegistry, PublicPlayer};
pub use round::{RoundCoordinator, RoundState};
