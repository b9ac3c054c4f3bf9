//! Round Coordinator
//!
//! State machine governing one play-through: a round is ACTIVE from the
//! moment its dungeon is installed until some player steps onto the goal
//! cell, at which point the coordinator records stats, regenerates the
//! dungeon, and resets every player to the new start point in one
//! synchronous step. The brief TRANSITIONING state is never observable
//! from outside: callers see one dungeon atomically replaced by the next.
//!
//! The coordinator exclusively owns the dungeon, the start/end points, and
//! the round clock. Mutation is serialized by the game loop (one command at
//! a time), so none of this needs locks.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::core::rng::{derive_round_seed, DeterministicRng};
use crate::game::dungeon::{Dungeon, Point};
use crate::game::generator::{generate, GenerationError, GeneratorConfig};
use crate::game::registry::PlayerRegistry;
use crate::stats::{GameStatsRecord, StatsSink};

/// Round lifecycle state.
///
/// `Transitioning` exists only inside [`RoundCoordinator::complete_round`]:
/// the transition is synchronous, so other components never observe it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundState {
    /// Players may move; the goal check is live.
    Active,
    /// Regeneration + reset + stats recording in progress.
    Transitioning,
}

/// Owns the authoritative dungeon and drives round transitions.
pub struct RoundCoordinator {
    config: GeneratorConfig,
    base_seed: u64,
    round_index: u64,
    state: RoundState,
    dungeon: Dungeon,
    start: Point,
    end: Point,
    round_started_at: Instant,
    stats: Arc<dyn StatsSink>,
}

impl RoundCoordinator {
    /// Generate the first dungeon and start round zero.
    ///
    /// Failing to produce a two-room dungeon here is a configuration error
    /// and aborts startup; there is no previous dungeon to fall back to.
    pub fn new(
        config: GeneratorConfig,
        base_seed: u64,
        stats: Arc<dyn StatsSink>,
    ) -> Result<Self, GenerationError> {
        let mut rng = DeterministicRng::new(derive_round_seed(base_seed, 0));
        let (dungeon, start, end) = build_round(&config, &mut rng)?;

        info!(
            "Initial dungeon generated: {}x{}, {} rooms",
            dungeon.width,
            dungeon.height,
            dungeon.room_count()
        );

        Ok(Self {
            config,
            base_seed,
            round_index: 0,
            state: RoundState::Active,
            dungeon,
            start,
            end,
            round_started_at: Instant::now(),
            stats,
        })
    }

    /// The current round's dungeon.
    pub fn dungeon(&self) -> &Dungeon {
        &self.dungeon
    }

    /// Where players spawn this round.
    pub fn start_point(&self) -> Point {
        self.start
    }

    /// The goal cell this round.
    pub fn end_point(&self) -> Point {
        self.end
    }

    /// Current state; `Active` outside of `complete_round`.
    pub fn state(&self) -> RoundState {
        self.state
    }

    /// Zero-based index of the current round.
    pub fn round_index(&self) -> u64 {
        self.round_index
    }

    /// Whether `position` is exactly the goal cell.
    pub fn is_goal(&self, position: Point) -> bool {
        position == self.end
    }

    /// Finish the current round and start the next one.
    ///
    /// Records stats (fire-and-forget), regenerates the dungeon, and resets
    /// every player to the new start point. On generation failure the
    /// generator is retried once; if that also fails the previous dungeon
    /// stays installed as a degraded fallback and players are reset onto it.
    /// Returns `true` when a fresh dungeon was installed.
    pub fn complete_round(&mut self, registry: &mut PlayerRegistry) -> bool {
        self.state = RoundState::Transitioning;

        let elapsed = self.round_started_at.elapsed().as_secs_f64();
        self.stats.record(&GameStatsRecord {
            duration_seconds: elapsed,
            player_count: registry.len(),
        });

        let next_index = self.round_index + 1;
        let mut rng = DeterministicRng::new(derive_round_seed(self.base_seed, next_index));

        let regenerated = match build_round(&self.config, &mut rng) {
            Ok(round) => Ok(round),
            Err(e) => {
                // Retry once with the same parameters; the RNG has advanced,
                // so the room placement draws differ.
                warn!("Dungeon generation failed ({}), retrying once", e);
                build_round(&self.config, &mut rng)
            }
        };

        let installed = match regenerated {
            Ok((dungeon, start, end)) => {
                self.dungeon = dungeon;
                self.start = start;
                self.end = end;
                self.round_index = next_index;
                info!(
                    "Round {} complete after {:.1}s, new dungeon with {} rooms",
                    next_index - 1,
                    elapsed,
                    self.dungeon.room_count()
                );
                true
            }
            Err(e) => {
                // Never crash the process over a bad round: keep serving the
                // previous dungeon.
                error!(
                    "Dungeon regeneration failed twice ({}), keeping previous dungeon",
                    e
                );
                false
            }
        };

        registry.reset_all_to(self.start);
        self.round_started_at = Instant::now();
        self.state = RoundState::Active;
        installed
    }

    #[cfg(test)]
    fn override_config(&mut self, config: GeneratorConfig) {
        self.config = config;
    }
}

/// Generate a dungeon and derive its start/end points.
fn build_round(
    config: &GeneratorConfig,
    rng: &mut DeterministicRng,
) -> Result<(Dungeon, Point, Point), GenerationError> {
    let dungeon = generate(config, rng)?;

    // generate() guarantees at least two rooms, so both lookups succeed;
    // map the impossible case into the generator's error rather than panic.
    let missing = |_| GenerationError::TooFewRooms {
        placed: dungeon.room_count(),
    };
    let start = dungeon.start_point().map_err(missing)?;
    let end = dungeon.end_point().map_err(missing)?;

    Ok((dungeon, start, end))
}

// =============================================================================
// TESTS
// =============================================================================
