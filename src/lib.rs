//! # Aviator Round Engine
//!
//! Authoritative engine for a continuously repeating crash game: players
//! bet during a timed window, a multiplier climbs from 1.00x until a
//! committed crash point, and players must cash out before the crash.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      AVIATOR SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── money.rs    - Integer minor-unit money, hundredths      │
//! │  │                 multipliers                               │
//! │  └── rng.rs      - Seeded Xorshift128+ PRNG, round seeds     │
//! │                                                              │
//! │  game/           - Round logic (pure, synchronous)           │
//! │  ├── ledger.rs   - Player + house balances                   │
//! │  ├── book.rs     - Per-round bets and their lifecycle        │
//! │  ├── crash.rs    - Crash-point selection policy              │
//! │  └── events.rs   - Broadcast payloads                        │
//! │                                                              │
//! │  engine/         - Timing and orchestration (async)          │
//! │  ├── clock.rs    - Cancellable countdown/ramp/restart timers │
//! │  └── round.rs    - Round state machine, public operations    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! The `core/` and `game/` modules use integer arithmetic only, so money
//! is exactly conserved (`sum(balances) + house` is invariant) and crash
//! comparisons never suffer float rounding. All mutable state is owned by
//! the round engine behind a single lock: a cashout and a crash settlement
//! can never race, and each bet resolves exactly once.
//!
//! The crash point is drawn by a weighted heuristic and committed before
//! the ramp starts. It is reproducible from the logged seed, but this is
//! **not** a provably-fair commit-reveal scheme.
//!
//! The HTTP/WebSocket transport, authentication and balance persistence
//! live outside this crate; they consume [`engine::RoundEngine`]'s
//! operations and its broadcast event stream.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod engine;
pub mod game;

// Re-export commonly used types
pub use core::money::{Amount, Multiplier, MULT_BASELINE};
pub use core::rng::GameRng;
pub use engine::round::{Cashout, EngineConfig, EngineError, EngineSnapshot, Phase, RoundEngine};
pub use game::events::{RoundEvent, RoundEventData};
pub use game::ledger::{LedgerSnapshot, PlayerId};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
