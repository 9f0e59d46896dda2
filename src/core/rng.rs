//! Seeded Random Number Generator
//!
//! Xorshift128+ PRNG for crash-point draws. Given the same seed it produces
//! an identical sequence on every platform, which keeps the selector
//! testable and makes round outcomes reproducible from the logged seed.
//!
//! This is weighted pseudo-randomness, not a cryptographic commit-reveal
//! scheme. The crash point is committed before the ramp starts and is never
//! recomputed, but nothing here constitutes a fairness proof.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::money::Multiplier;

/// Seeded PRNG using the Xorshift128+ algorithm.
///
/// # Example
///
/// ```
/// use aviator::core::rng::GameRng;
///
/// let mut rng = GameRng::new(12345);
/// let a = rng.next_u64();
/// let mut again = GameRng::new(12345);
/// assert_eq!(a, again.next_u64()); // Always the same sequence
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameRng {
    state: [u64; 2],
}

impl Default for GameRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl GameRng {
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

    /// Create an RNG seeded from the process clock.
    ///
    /// Used when no explicit seed is configured; round seeds derived from
    /// this are still logged so outcomes stay reproducible after the fact.
    pub fn from_entropy() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x5EED);
        Self::new(nanos)
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

    /// Draw a multiplier uniformly from [min, max) hundredths.
    ///
    /// `min >= max` collapses to `min`, so callers cannot get an
    /// out-of-range crash point from a misconfigured bucket.
    #[inline]
    pub fn next_multiplier(&mut self, min: Multiplier, max: Multiplier) -> Multiplier {
        if min >= max {
            return min;
        }
        min + self.next_int(max - min)
    }

    /// Generate a random boolean that is true with probability
    /// `percent` / 100.
    #[inline]
    pub fn chance(&mut self, percent: u32) -> bool {
        self.next_int(100) < percent
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

/// Derive a per-round seed from the server seed and round number.
///
/// The derived seed is committed (and logged) before the ramp starts, so a
/// round's crash point is fixed at the Betting -> Running boundary and can
/// be re-derived for auditing. It is NOT unpredictable to someone who knows
/// the server seed; see the module docs.
pub fn derive_round_seed(server_seed: u64, round: u64, round_id: &[u8; 16]) -> u64 {
    let mut hasher = Sha256::new();

    // Domain separator
    hasher.update(b"AVIATOR_ROUND_SEED_V1");
    hasher.update(server_seed.to_le_bytes());
    hasher.update(round.to_le_bytes());
    hasher.update(round_id);

    let hash = hasher.finalize();

    // Take first 8 bytes as seed
    u64::from_le_bytes(hash[0..8].try_into().expect("sha256 output >= 8 bytes"))
}

// =============================================================================
// TESTS
// =============================================================================
