//! Balance Ledger
//!
//! Owns player balances and the house balance. Every mutation is a matched
//! transfer between a player and the house, so total money
//! (`sum(balances) + house`) is conserved across all operations.
//!
//! Uses BTreeMap so snapshots and logs iterate players in a stable order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::money::Amount;

/// Player identifier as supplied by the transport layer.
pub type PlayerId = String;

/// Ledger errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Debit larger than the player's balance (or unknown player).
    #[error("insufficient funds")]
    InsufficientFunds,
}

/// Immutable view of all balances, for reporting and broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Player balances in minor units, sorted by player id.
    pub balances: BTreeMap<PlayerId, Amount>,
    /// House balance in minor units. Negative means the house owes more
    /// than it has taken in.
    pub house_balance: Amount,
}

/// Player and house balances.
///
/// A debit moves money player -> house, a credit moves it house -> player.
/// Neither operation ever partially applies.
#[derive(Debug, Clone)]
pub struct Ledger {
    balances: BTreeMap<PlayerId, Amount>,
    house_balance: Amount,
}

impl Ledger {
    /// Create a ledger from seed balances.
    pub fn new(player_seeds: BTreeMap<PlayerId, Amount>, house_seed: Amount) -> Self {
        debug_assert!(player_seeds.values().all(|b| *b >= 0));
        Self {
            balances: player_seeds,
            house_balance: house_seed,
        }
    }

    /// Move `amount` from a player to the house.
    ///
    /// Fails with [`LedgerError::InsufficientFunds`] if the player is
    /// unknown or the amount exceeds their balance. Returns the player's
    /// new balance on success.
    pub fn debit(&mut self, player: &str, amount: Amount) -> Result<Amount, LedgerError> {
        debug_assert!(amount > 0);
        let balance = self
            .balances
            .get_mut(player)
            .ok_or(LedgerError::InsufficientFunds)?;
        if amount > *balance {
            return Err(LedgerError::InsufficientFunds);
        }
        *balance -= amount;
        self.house_balance += amount;
        Ok(*balance)
    }

    /// Move `amount` from the house to a player.
    ///
    /// The house balance may go negative: paying out more than was bet in
    /// is expected short-term behavior. Creates the account if the player
    /// is unknown. Returns the player's new balance.
    pub fn credit(&mut self, player: &str, amount: Amount) -> Amount {
        debug_assert!(amount >= 0);
        let balance = self.balances.entry(player.to_string()).or_insert(0);
        *balance += amount;
        self.house_balance -= amount;
        *balance
    }

    /// Current balance of a player (0 if unknown).
    pub fn balance(&self, player: &str) -> Amount {
        self.balances.get(player).copied().unwrap_or(0)
    }

    /// Current house balance.
    pub fn house_balance(&self) -> Amount {
        self.house_balance
    }

    /// Owned, immutable view of all balances.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            balances: self.balances.clone(),
            house_balance: self.house_balance,
        }
    }

    /// Total money in the system: `sum(balances) + house`.
    ///
    /// Constant across debits and credits; checked by tests.
    pub fn total(&self) -> Amount {
        self.balances.values().sum::<Amount>() + self.house_balance
    }
}

// =============================================================================
// TESTS
// =============================================================================
