//! Lossless decimal type backed by rust_decimal.
//!
//! Amounts are parsed from and stored as canonical strings so that SQLite never
//! sees a float.

use rust_decimal::{Decimal as RustDecimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of decimal places carried by every stored amount.
pub const MONEY_DP: u32 = 2;

/// Lossless decimal numeric type for fee arithmetic.
///
/// Serializes to a JSON string so no precision is lost on the wire.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::str")] RustDecimal);

impl Decimal {
    pub fn new(value: RustDecimal) -> Self {
        Decimal(value)
    }

    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s.trim()).map(Decimal)
    }

    /// Format without exponent notation and without trailing zeros.
    pub fn to_canonical_string(&self) -> String {
        format!("{}", self.0.normalize())
    }

    /// Format with exactly `dp` fractional digits ("7.5" -> "7.50" for dp = 2).
    pub fn to_fixed_string(&self, dp: u32) -> String {
        let mut value = self.round_half_up(dp).0;
        value.rescale(dp);
        value.to_string()
    }

    pub fn inner(&self) -> RustDecimal {
        self.0
    }

    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    pub fn hundred() -> Self {
        Decimal(RustDecimal::ONE_HUNDRED)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    /// Number of fractional digits after dropping trailing zeros.
    pub fn significant_scale(&self) -> u32 {
        self.0.normalize().scale()
    }

    /// Currency rounding: midpoint goes away from zero (2.345 -> 2.35).
    pub fn round_half_up(&self, dp: u32) -> Self {
        Decimal(
            self.0
                .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// `self * percent / 100`, unrounded. `None` when the product overflows.
    pub fn percent_of(&self, percent: Decimal) -> Option<Self> {
        self.0
            .checked_mul(percent.0)
            .and_then(|product| product.checked_div(RustDecimal::ONE_HUNDRED))
            .map(Decimal)
    }

    pub fn checked_add(self, other: Decimal) -> Option<Self> {
        self.0.checked_add(other.0).map(Decimal)
    }

    pub fn checked_sub(self, other: Decimal) -> Option<Self> {
        self.0.checked_sub(other.0).map(Decimal)
    }

    pub fn checked_mul(self, other: Decimal) -> Option<Self> {
        self.0.checked_mul(other.0).map(Decimal)
    }

    pub fn min(self, other: Decimal) -> Self {
        Decimal(self.0.min(other.0))
    }

    pub fn max(self, other: Decimal) -> Self {
        Decimal(self.0.max(other.0))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<RustDecimal> for Decimal {
    fn from(value: RustDecimal) -> Self {
        Decimal(value)
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Decimal(RustDecimal::from(value))
    }
}

impl From<Decimal> for RustDecimal {
    fn from(value: Decimal) -> Self {
        value.0
    }
}
