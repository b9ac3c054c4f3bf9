//! Deterministic Random Number Generator
//!
//! Xorshift128+ PRNG used by the dungeon generator. Given the same seed it
//! produces an identical sequence on all platforms, so a whole server run
//! (every round's dungeon) is reproducible from the configured base seed.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Deterministic PRNG using the Xorshift128+ algorithm.
///
/// # Example
///
/// ```
/// use dungeon_server::core::rng::DeterministicRng;
///
/// let mut rng = DeterministicRng::new(12345);
/// let a = rng.next_u64();
/// let mut replay = DeterministicRng::new(12345);
/// assert_eq!(a, replay.next_u64());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    ///
    /// Uses SplitMix64 to initialize the internal state, ensuring
    /// good distribution even from weak seeds.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // State must never be all zeros
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a random integer in range [0, max).
    #[inline]
    pub fn next_int(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        // Simple modulo - slight bias for very large max, but acceptable
        (self.next_u64() % max as u64) as u32
    }

    /// Generate a random integer in range [min, max] inclusive.
    #[inline]
    pub fn next_int_range(&mut self, min: i32, max: i32) -> i32 {
        if min >= max {
            return min;
        }
        let range = (max - min + 1) as u32;
        min + self.next_int(range) as i32
    }

    /// Fair coin flip.
    #[inline]
    pub fn coin(&mut self) -> bool {
        self.next_u64() & 1 == 0
    }

    /// Get current state (for checkpointing/debugging).
    pub fn state(&self) -> [u64; 2] {
        self.state
    }
}

/// SplitMix64 for seed initialization.
/// Produces well-distributed values from sequential seeds.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive the seed for one round from the server's base seed and the
/// zero-based round index.
///
/// Every round after the first regenerates the dungeon; hashing instead of
/// reusing one RNG across rounds means a round's layout can be reproduced
/// without replaying every round before it.
pub fn derive_round_seed(base_seed: u64, round_index: u64) -> u64 {
    let mut hasher = Sha256::new();

    // Domain separator
    hasher.update(b"DUNGEON_ROUND_SEED_V1");
    hasher.update(base_seed.to_le_bytes());
    hasher.update(round_index.to_le_bytes());

    let hash = hasher.finalize();

    // Take first 8 bytes as seed
    u64::from_le_bytes(hash[0..8].try_into().unwrap())
}

// =============================================================================
// TESTS
// =============================================================================
