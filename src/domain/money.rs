//! Currency-tagged amounts.

use crate::domain::decimal::{Decimal, MONEY_DP};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Supported settlement currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    #[serde(rename = "NGN")]
    Ngn,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Ngn => "NGN",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NGN" => Ok(Currency::Ngn),
            other => Err(MoneyError::UnsupportedCurrency(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),
    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: Currency, right: Currency },
    #[error("amount {0} has more than 2 decimal places")]
    Precision(String),
    #[error("invalid amount: {0}")]
    Parse(String),
    #[error("amount out of range")]
    Overflow,
}

/// A 2-decimal-place amount tagged with its currency.
///
/// Arithmetic only combines values of the same currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: Currency,
}

impl Money {
    /// Construct a money value, rejecting sub-unit precision.
    ///
    /// # Errors
    /// Returns `MoneyError::Precision` when `amount` carries more than 2 decimal places.
    pub fn new(amount: Decimal, currency: Currency) -> Result<Self, MoneyError> {
        if amount.significant_scale() > MONEY_DP {
            return Err(MoneyError::Precision(amount.to_canonical_string()));
        }
        Ok(Money { amount, currency })
    }

    /// Round an arbitrary-precision amount half-up into a money value.
    pub fn rounded(amount: Decimal, currency: Currency) -> Self {
        Money {
            amount: amount.round_half_up(MONEY_DP),
            currency,
        }
    }

    pub fn zero(currency: Currency) -> Self {
        Money {
            amount: Decimal::zero(),
            currency,
        }
    }

    /// Parse `amount` with the given currency code.
    pub fn parse(amount: &str, currency: &str) -> Result<Self, MoneyError> {
        let currency = Currency::from_str(currency)?;
        let amount = Decimal::from_str_canonical(amount)
            .map_err(|_| MoneyError::Parse(amount.to_string()))?;
        Money::new(amount, currency)
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.amount.is_negative()
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency,
                right: other.currency,
            });
        }
        Ok(())
    }

    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        let amount = self.amount.checked_add(other.amount).ok_or(MoneyError::Overflow)?;
        Ok(Money {
            amount,
            currency: self.currency,
        })
    }

    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        let amount = self.amount.checked_sub(other.amount).ok_or(MoneyError::Overflow)?;
        Ok(Money {
            amount,
            currency: self.currency,
        })
    }

    /// `a < b`, only when both share a currency.
    pub fn checked_lt(&self, other: &Money) -> Result<bool, MoneyError> {
        self.ensure_same_currency(other)?;
        Ok(self.amount < other.amount)
    }

    pub fn checked_gt(&self, other: &Money) -> Result<bool, MoneyError> {
        self.ensure_same_currency(other)?;
        Ok(self.amount > other.amount)
    }

    /// Amount formatted with exactly two fractional digits.
    pub fn amount_string(&self) -> String {
        self.amount.to_fixed_string(MONEY_DP)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.currency, self.amount_string())
    }
}
