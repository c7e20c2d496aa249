//! Fee configuration rules and their save-time validation.

use crate::domain::choices::{FeeBearer, FeeType, PaymentChannel, TransactionType};
use crate::domain::decimal::{Decimal, MONEY_DP};
use crate::domain::money::{Currency, Money};
use crate::domain::primitives::{ConfigurationId, TimeMs, WalletId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejection reasons for a configuration or its tier set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("customer and merchant percentages must sum to 100 (got {customer} + {merchant})")]
    SplitPercentagesSum { customer: Decimal, merchant: Decimal },
    #[error("{field} must be between 0 and 100 (got {value})")]
    PercentageOutOfRange { field: &'static str, value: Decimal },
    #[error("{field} has more than 2 decimal places")]
    Precision { field: &'static str },
    #[error("percentage fee must be greater than 0 for percentage fee type")]
    ZeroPercentageFee,
    #[error("flat fee must be greater than 0 for flat fee type")]
    ZeroFlatFee,
    #[error("{field} must not be negative")]
    NegativeAmount { field: &'static str },
    #[error("{field} is in {found}, configuration is in {expected}")]
    CurrencyMismatch {
        field: &'static str,
        expected: Currency,
        found: Currency,
    },
    #[error("minimum fee {minimum} exceeds fee cap {cap}")]
    MinimumAboveCap { minimum: Decimal, cap: Decimal },
    #[error("valid_from must not be after valid_until")]
    InvalidValidityWindow,
    #[error("tier {index}: min_amount exceeds max_amount")]
    TierRange { index: usize },
    #[error("tiers {first} and {second} overlap")]
    TierOverlap { first: usize, second: usize },
    #[error("tier {index} is unbounded but is not the highest tier")]
    UnboundedTierNotLast { index: usize },
}

/// A rule describing how to price transactions in its scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeConfiguration {
    pub id: ConfigurationId,
    pub name: String,
    pub description: Option<String>,
    /// `None` makes this a global rule.
    pub wallet_id: Option<WalletId>,
    pub transaction_type: TransactionType,
    /// `None` matches every channel.
    pub payment_channel: Option<PaymentChannel>,
    pub fee_type: FeeType,
    pub percentage_fee: Decimal,
    pub flat_fee: Money,
    pub fee_cap: Option<Money>,
    pub minimum_fee: Option<Money>,
    /// Hybrid only: the flat component is waived for amounts strictly below this.
    pub waiver_threshold: Option<Money>,
    pub fee_bearer: FeeBearer,
    pub customer_percentage: Decimal,
    pub merchant_percentage: Decimal,
    pub is_active: bool,
    pub priority: i32,
    pub valid_from: Option<TimeMs>,
    pub valid_until: Option<TimeMs>,
    pub metadata: serde_json::Value,
    pub created_at: TimeMs,
    pub updated_at: TimeMs,
}

impl FeeConfiguration {
    /// A global, active, zero-fee hybrid rule with a 50/50 split and platform bearer.
    pub fn new(name: impl Into<String>, transaction_type: TransactionType) -> Self {
        let now = TimeMs::now();
        Self {
            id: ConfigurationId::new_v4(),
            name: name.into(),
            description: None,
            wallet_id: None,
            transaction_type,
            payment_channel: None,
            fee_type: FeeType::default(),
            percentage_fee: Decimal::zero(),
            flat_fee: Money::zero(Currency::default()),
            fee_cap: None,
            minimum_fee: None,
            waiver_threshold: None,
            fee_bearer: FeeBearer::default(),
            customer_percentage: Decimal::from(50),
            merchant_percentage: Decimal::from(50),
            is_active: true,
            priority: 0,
            valid_from: None,
            valid_until: None,
            metadata: serde_json::Value::Object(Default::default()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Currency every money field of this configuration must carry.
    pub fn currency(&self) -> Currency {
        self.flat_fee.currency
    }

    pub fn is_global(&self) -> bool {
        self.wallet_id.is_none()
    }

    /// Whether `at` falls within `[valid_from, valid_until]`; open ends are unbounded.
    pub fn is_valid_at(&self, at: TimeMs) -> bool {
        self.valid_from.map_or(true, |from| at >= from)
            && self.valid_until.map_or(true, |until| at <= until)
    }

    /// Check every save-time rule.
    ///
    /// # Errors
    /// Returns the first rule violation found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }

        check_percentage("percentage_fee", self.percentage_fee)?;
        check_percentage("customer_percentage", self.customer_percentage)?;
        check_percentage("merchant_percentage", self.merchant_percentage)?;

        if self.fee_bearer == FeeBearer::Split {
            let total = self
                .customer_percentage
                .checked_add(self.merchant_percentage);
            if total != Some(Decimal::hundred()) {
                return Err(ValidationError::SplitPercentagesSum {
                    customer: self.customer_percentage,
                    merchant: self.merchant_percentage,
                });
            }
        }

        match self.fee_type {
            FeeType::Percentage if self.percentage_fee.is_zero() => {
                return Err(ValidationError::ZeroPercentageFee)
            }
            FeeType::Flat if self.flat_fee.is_zero() => return Err(ValidationError::ZeroFlatFee),
            _ => {}
        }

        let currency = self.currency();
        check_money("flat_fee", &self.flat_fee, currency)?;
        for (field, value) in [
            ("fee_cap", &self.fee_cap),
            ("minimum_fee", &self.minimum_fee),
            ("waiver_threshold", &self.waiver_threshold),
        ] {
            if let Some(money) = value {
                check_money(field, money, currency)?;
            }
        }

        if let (Some(minimum), Some(cap)) = (&self.minimum_fee, &self.fee_cap) {
            if minimum.amount > cap.amount {
                return Err(ValidationError::MinimumAboveCap {
                    minimum: minimum.amount,
                    cap: cap.amount,
                });
            }
        }

        if let (Some(from), Some(until)) = (self.valid_from, self.valid_until) {
            if from > until {
                return Err(ValidationError::InvalidValidityWindow);
            }
        }

        Ok(())
    }
}

fn check_percentage(field: &'static str, value: Decimal) -> Result<(), ValidationError> {
    if value.is_negative() || value > Decimal::hundred() {
        return Err(ValidationError::PercentageOutOfRange { field, value });
    }
    if value.significant_scale() > MONEY_DP {
        return Err(ValidationError::Precision { field });
    }
    Ok(())
}

pub(crate) fn check_money(
    field: &'static str,
    money: &Money,
    expected: Currency,
) -> Result<(), ValidationError> {
    if money.currency != expected {
        return Err(ValidationError::CurrencyMismatch {
            field,
            expected,
            found: money.currency,
        });
    }
    if money.is_negative() {
        return Err(ValidationError::NegativeAmount { field });
    }
    if money.amount.significant_scale() > MONEY_DP {
        return Err(ValidationError::Precision { field });
    }
    Ok(())
}
