//! Round Events
//!
//! Broadcast payloads emitted by the round engine. The transport layer fans
//! these out to observers; each event carries the round id so a durability
//! layer could persist them as a discrete, ordered stream.
//!
//! Multipliers are converted to floats here because events are display
//! surface; all settlement arithmetic stays in integer hundredths.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::money::{multiplier_to_float, Amount, Multiplier};
use crate::game::ledger::PlayerId;

/// Event payload data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RoundEventData {
    /// Betting phase opened; countdown started.
    BettingStarted {
        /// Whole seconds until betting closes.
        countdown: u32,
    },

    /// One second elapsed in the betting countdown.
    CountdownTick {
        /// Whole seconds remaining.
        countdown: u32,
    },

    /// Multiplier ramp advanced one tick.
    MultiplierUpdate {
        /// Current displayed multiplier.
        multiplier: f64,
    },

    /// A player converted an active bet into a payout.
    PlayerCashedOut {
        /// Who cashed out.
        player_id: PlayerId,
        /// Multiplier at cashout time.
        multiplier: f64,
        /// Payout in minor units.
        winnings: Amount,
        /// Player balance after the credit.
        new_balance: Amount,
        /// House balance after the credit.
        house_balance: Amount,
    },

    /// The round crashed; the committed crash point is revealed.
    Crashed {
        /// The crash multiplier, hidden until this moment.
        crash_point: f64,
        /// House balance after settlement.
        house_balance: Amount,
    },

    /// House balance snapshot after crash settlement.
    HouseBalanceUpdate {
        /// Current house balance.
        house_balance: Amount,
    },
}

/// A round event with its round of origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundEvent {
    /// Round this event belongs to.
    pub round_id: Uuid,
    /// Event payload.
    #[serde(flatten)]
    pub data: RoundEventData,
}

impl RoundEvent {
    /// Create a betting-started event.
    pub fn betting_started(round_id: Uuid, countdown: u32) -> Self {
        Self {
            round_id,
            data: RoundEventData::BettingStarted { countdown },
        }
    }

    /// Create a countdown-tick event.
    pub fn countdown_tick(round_id: Uuid, countdown: u32) -> Self {
        Self {
            round_id,
            data: RoundEventData::CountdownTick { countdown },
        }
    }

    /// Create a multiplier-update event.
    pub fn multiplier_update(round_id: Uuid, multiplier: Multiplier) -> Self {
        Self {
            round_id,
            data: RoundEventData::MultiplierUpdate {
                multiplier: multiplier_to_float(multiplier),
            },
        }
    }

    /// Create a player-cashed-out event.
    pub fn player_cashed_out(
        round_id: Uuid,
        player_id: PlayerId,
        multiplier: Multiplier,
        winnings: Amount,
        new_balance: Amount,
        house_balance: Amount,
    ) -> Self {
        Self {
            round_id,
            data: RoundEventData::PlayerCashedOut {
                player_id,
                multiplier: multiplier_to_float(multiplier),
                winnings,
                new_balance,
                house_balance,
            },
        }
    }

    /// Create a crash event.
    pub fn crashed(round_id: Uuid, crash_point: Multiplier, house_balance: Amount) -> Self {
        Self {
            round_id,
            data: RoundEventData::Crashed {
                crash_point: multiplier_to_float(crash_point),
                house_balance,
            },
        }
    }

    /// Create a house-balance-update event.
    pub fn house_balance_update(round_id: Uuid, house_balance: Amount) -> Self {
        Self {
            round_id,
            data: RoundEventData::HouseBalanceUpdate { house_balance },
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplier_converted_for_display() {
        let event = RoundEvent::multiplier_update(Uuid::nil(), 157);
        match event.data {
            RoundEventData::MultiplierUpdate { multiplier } => {
                assert!((multiplier - 1.57).abs() < 1e-9);
            }
            _ => panic!("wrong event"),
        }
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = RoundEvent::crashed(Uuid::nil(), 250, 12_345);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "crashed");
        assert_eq!(json["crash_point"], 2.5);
        assert_eq!(json["house_balance"], 12_345);
        assert!(json["round_id"].is_string());
    }
}
