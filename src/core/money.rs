//! Minor-Unit Money and Hundredths Multipliers
//!
//! All ledger arithmetic uses integer minor units (cents) - no floats in
//! settlement logic. Multipliers are scaled by 100 (hundredths), so a
//! crash point of 1.57x is stored as 157 and "round to 2 decimal places"
//! is inherent to the representation.
//!
//! ## Why integers?
//!
//! - Exact crash comparisons: `multiplier >= crash_point` never suffers an
//!   off-by-one-tick float mismatch
//! - Conserved money: debits and credits are exact, so
//!   `sum(balances) + house` is a checkable invariant
//! - Deterministic payouts on every platform

use std::fmt;

/// Monetary amount in minor units (cents). Signed so the house balance
/// can go negative when payouts exceed intake.
pub type Amount = i64;

/// Minor units per whole currency unit.
pub const CENTS_PER_UNIT: Amount = 100;

/// Displayed multiplier scaled by 100 (157 = 1.57x).
pub type Multiplier = u32;

/// Multiplier scale factor (hundredths).
pub const MULT_SCALE: Multiplier = 100;

/// Baseline multiplier at ramp start: 1.00x.
pub const MULT_BASELINE: Multiplier = 100;

/// Convert whole currency units to an [`Amount`].
///
/// # Example
/// ```
/// use aviator::core::money::{amount, CENTS_PER_UNIT};
/// assert_eq!(amount(1000), 1000 * CENTS_PER_UNIT);
/// ```
#[inline]
pub const fn amount(units: i64) -> Amount {
    units * CENTS_PER_UNIT
}

/// Convert a compile-time float multiplier to hundredths.
///
/// Rounds to the nearest hundredth so values like 1.2 (not exactly
/// representable in binary) land on 120, not 119. Only for constants and
/// configuration. Never in settlement logic.
#[inline]
pub const fn to_multiplier(m: f64) -> Multiplier {
    (m * MULT_SCALE as f64 + 0.5) as Multiplier
}

/// Convert a multiplier to a float for display/broadcast.
///
/// Display only - settlement always uses the integer form.
#[inline]
pub fn multiplier_to_float(m: Multiplier) -> f64 {
    m as f64 / MULT_SCALE as f64
}

/// Apply a multiplier to a stake, truncating toward zero.
///
/// Uses i128 intermediate so `stake * multiplier` cannot overflow.
#[inline]
pub fn apply_multiplier(stake: Amount, multiplier: Multiplier) -> Amount {
    ((stake as i128 * multiplier as i128) / MULT_SCALE as i128) as Amount
}

/// Format an amount as a whole-unit decimal string for logs.
pub fn display_amount(a: Amount) -> String {
    let sign = if a < 0 { "-" } else { "" };
    let abs = a.unsigned_abs();
    format!(
        "{}{}.{:02}",
        sign,
        abs / CENTS_PER_UNIT as u64,
        abs % CENTS_PER_UNIT as u64
    )
}

/// Wrapper for formatting multipliers as "1.57x" in logs.
pub struct DisplayMultiplier(pub Multiplier);

impl fmt::Display for DisplayMultiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02}x",
            self.0 / MULT_SCALE,
            self.0 % MULT_SCALE
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================
