//! Deterministic Primitives
//!
//! Integer money arithmetic and seeded randomness. Everything in this
//! module is pure and platform-independent.

pub mod money;
pub mod rng;

pub use money::{Amount, Multiplier, MULT_BASELINE, MULT_SCALE};
pub use rng::GameRng;
