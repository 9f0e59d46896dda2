//! Game Logic Module
//!
//! Pure, synchronous round logic. No clocks, no async - everything here is
//! driven by the engine layer and is directly unit-testable.
//!
//! ## Module Structure
//!
//! - `ledger`: Player and house balances, atomic debits/credits
//! - `book`: Per-round bet set and bet lifecycle
//! - `crash`: Crash-point selection policy
//! - `events`: Broadcast payloads for the transport layer

pub mod book;
pub mod crash;
pub mod events;
pub mod ledger;

// Re-export key types
pub use book::{Bet, BetBook, BetState, BookError, Forfeit};
pub use crash::{select_crash_point, CrashConfig, RoundStats};
pub use events::{RoundEvent, RoundEventData};
pub use ledger::{Ledger, LedgerError, LedgerSnapshot, PlayerId};
