//! Bet Book
//!
//! The set of bets for the current round, one per player. Cleared exactly
//! once per round at betting-phase start. Bets move through a strict
//! lifecycle: Active -> CashedOut or Active -> Lost, and terminal bets
//! never transition again.
//!
//! Phase gating (is betting open, is the round running) belongs to the
//! round engine; the book only enforces per-bet rules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::money::{Amount, Multiplier};
use crate::game::ledger::PlayerId;

/// Bet book errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookError {
    /// The player already has a bet this round.
    #[error("duplicate bet")]
    DuplicateBet,

    /// No bet for this player, or the bet is already terminal.
    #[error("no active bet")]
    NoActiveBet,
}

/// Lifecycle state of a bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetState {
    /// Placed, round not yet resolved for this player.
    Active,
    /// Cashed out before the crash (terminal).
    CashedOut {
        /// Multiplier at cashout time, in hundredths.
        at: Multiplier,
    },
    /// Round crashed before cashout; stake forfeited (terminal).
    Lost,
}

impl BetState {
    /// Whether the bet can still be resolved.
    pub fn is_active(&self) -> bool {
        matches!(self, BetState::Active)
    }
}

/// A single player's bet for the current round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    /// Stake in minor units. Positive; at most the player's balance at
    /// placement time (enforced by the ledger debit).
    pub stake: Amount,
    /// Lifecycle state.
    pub state: BetState,
}

/// A forfeited stake, produced at crash settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forfeit {
    /// Player whose bet was lost.
    pub player_id: PlayerId,
    /// The forfeited stake.
    pub stake: Amount,
}

/// All bets for the current round.
#[derive(Debug, Clone, Default)]
pub struct BetBook {
    bets: BTreeMap<PlayerId, Bet>,
}

impl BetBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard all bets. Called once per round, at betting-phase start.
    pub fn reset(&mut self) {
        self.bets.clear();
    }

    /// Record a new active bet.
    ///
    /// Fails with [`BookError::DuplicateBet`] if the player already has a
    /// bet this round. The caller performs the ledger debit atomically with
    /// this insertion: it must validate the debit can succeed before
    /// inserting, or insert before an infallible debit.
    pub fn place(&mut self, player: &str, stake: Amount) -> Result<(), BookError> {
        debug_assert!(stake > 0);
        if self.bets.contains_key(player) {
            return Err(BookError::DuplicateBet);
        }
        self.bets.insert(
            player.to_string(),
            Bet {
                stake,
                state: BetState::Active,
            },
        );
        Ok(())
    }

    /// Mark a bet as cashed out at the given multiplier.
    ///
    /// Exactly-once: a second attempt for the same player fails with
    /// [`BookError::NoActiveBet`]. Returns the stake so the caller can
    /// compute winnings.
    pub fn mark_cashed_out(
        &mut self,
        player: &str,
        at: Multiplier,
    ) -> Result<Amount, BookError> {
        let bet = self.bets.get_mut(player).ok_or(BookError::NoActiveBet)?;
        if !bet.state.is_active() {
            return Err(BookError::NoActiveBet);
        }
        bet.state = BetState::CashedOut { at };
        Ok(bet.stake)
    }

    /// Bets still active (not cashed out), as of now.
    pub fn unresolved(&self) -> impl Iterator<Item = (&PlayerId, &Bet)> {
        self.bets.iter().filter(|(_, bet)| bet.state.is_active())
    }

    /// Mark every unresolved bet as lost and return the forfeited stakes.
    ///
    /// Called once at crash settlement. Cashed-out bets are untouched, so
    /// nothing is ever double-settled.
    pub fn forfeit_unresolved(&mut self) -> Vec<Forfeit> {
        let mut forfeits = Vec::new();
        for (player_id, bet) in self.bets.iter_mut() {
            if bet.state.is_active() {
                bet.state = BetState::Lost;
                forfeits.push(Forfeit {
                    player_id: player_id.clone(),
                    stake: bet.stake,
                });
            }
        }
        forfeits
    }

    /// Look up a player's bet.
    pub fn get(&self, player: &str) -> Option<&Bet> {
        self.bets.get(player)
    }

    /// Number of bets placed this round.
    pub fn len(&self) -> usize {
        self.bets.len()
    }

    /// Whether no bets were placed this round.
    pub fn is_empty(&self) -> bool {
        self.bets.is_empty()
    }

    /// Number of bets already cashed out this round.
    pub fn cashed_out_count(&self) -> usize {
        self.bets
            .values()
            .filter(|bet| matches!(bet.state, BetState::CashedOut { .. }))
            .count()
    }

    /// Sum of all stakes placed this round.
    pub fn total_staked(&self) -> Amount {
        self.bets.values().map(|bet| bet.stake).sum()
    }
}

// =============================================================================
// TESTS
// =============================================================================
