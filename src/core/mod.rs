//! Deterministic primitives.
//!
//! Everything under `core/` is free of system time, platform floats, and
//! ambient randomness, so dungeon generation replays identically from a seed.

pub mod rng;

pub use rng::{derive_round_seed, DeterministicRng};
