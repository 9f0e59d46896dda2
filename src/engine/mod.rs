//! Engine Module
//!
//! The async, non-deterministic layer: cancellable timers and the round
//! lifecycle loop that serializes every mutation of ledger, bet book and
//! round state.
//!
//! - `clock`: Generation-stamped, cancellable phase timers
//! - `round`: The round engine state machine and public operations

pub mod clock;
pub mod round;

// Re-export key types
pub use clock::{ClockEvent, ClockSignal, RoundClock};
pub use round::{Cashout, EngineConfig, EngineError, EngineSnapshot, Phase, RoundEngine};
