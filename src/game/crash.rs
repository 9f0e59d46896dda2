//! Crash-Point Selector
//!
//! Pure computation of a round's crash multiplier from bet-book statistics
//! and the house balance. Called exactly once per round, at the
//! Betting -> Running boundary, and the result is committed for the round.
//!
//! This is a heuristic weighted draw, evaluated in priority order:
//!
//! 1. House protection: house balance below the configured floor draws a
//!    deliberately low crash point to recover losses
//! 2. Empty round: no bets means no money at risk, so a high multiplier is
//!    drawn purely for spectacle
//! 3. Engagement weighting: a ceiling picked from the fraction of bets
//!    already cashed out, then a uniform draw up to that ceiling
//!
//! Because the selector runs before any cashout is possible, the cashed-out
//! fraction is always zero under current wiring and only the lowest
//! engagement bucket is ever taken. The higher buckets are kept as
//! specified; feeding end-of-round cashout statistics into the *next*
//! round's draw would be a behavior change, not a fix.
//!
//! This is not a provably-fair commitment scheme. See [`crate::core::rng`].

use crate::core::money::{to_multiplier, Amount, Multiplier};
use crate::core::rng::GameRng;

/// Near-instant crash drawn half the time in house-protection mode: 1.10x.
pub const PROTECT_INSTANT: Multiplier = to_multiplier(1.1);
/// House-protection moderate draw range: [1.30x, 2.50x).
pub const PROTECT_RANGE: (Multiplier, Multiplier) = (to_multiplier(1.3), to_multiplier(2.5));
/// Empty-round draw range: [8.00x, 15.00x).
pub const EMPTY_RANGE: (Multiplier, Multiplier) = (to_multiplier(8.0), to_multiplier(15.0));
/// Lower bound of every engagement-weighted draw: 1.20x.
pub const ENGAGED_MIN: Multiplier = to_multiplier(1.2);

/// Selector configuration.
#[derive(Debug, Clone)]
pub struct CrashConfig {
    /// House-protection floor. Defaults to 80% of the house seed balance.
    pub house_floor: Amount,
}

/// Bet-book statistics the selector reads.
#[derive(Debug, Clone, Copy)]
pub struct RoundStats {
    /// House balance at selection time.
    pub house_balance: Amount,
    /// Number of bets placed this round.
    pub total_bets: usize,
    /// Number of those bets already cashed out. Always zero at the
    /// Betting -> Running boundary; see the module docs.
    pub cashed_out: usize,
}

impl RoundStats {
    /// Cashed-out fraction as a percentage (0 when no bets were placed).
    pub fn cashout_percent(&self) -> u32 {
        if self.total_bets == 0 {
            return 0;
        }
        (self.cashed_out * 100 / self.total_bets) as u32
    }
}

/// Pick the crash multiplier for a round.
///
/// Never fails; every path yields a multiplier of at least
/// [`PROTECT_INSTANT`]. The caller commits the result for the round.
pub fn select_crash_point(rng: &mut GameRng, stats: &RoundStats, config: &CrashConfig) -> Multiplier {
    // 1. House recovering losses: bias hard toward low crashes.
    if stats.house_balance < config.house_floor {
        return if rng.chance(50) {
            PROTECT_INSTANT
        } else {
            rng.next_multiplier(PROTECT_RANGE.0, PROTECT_RANGE.1)
        };
    }

    // 2. No money at risk: show a generous multiplier for spectacle.
    if stats.total_bets == 0 {
        return rng.next_multiplier(EMPTY_RANGE.0, EMPTY_RANGE.1);
    }

    // 3. Engagement-weighted ceiling, then uniform draw up to it.
    let percent = stats.cashout_percent();
    let ceiling = if percent > 70 {
        if rng.chance(50) {
            to_multiplier(4.5)
        } else {
            to_multiplier(5.5)
        }
    } else if percent > 40 {
        if rng.chance(50) {
            to_multiplier(2.5)
        } else {
            to_multiplier(3.5)
        }
    } else {
        // The only reachable bucket under current wiring
        if rng.chance(60) {
            to_multiplier(1.5)
        } else {
            to_multiplier(2.0)
        }
    };

    rng.next_multiplier(ENGAGED_MIN, ceiling)
}

// =============================================================================
// TESTS
// =============================================================================
