use serde::Serialize;

use super::{ConfiguredRule, FeeError};
use crate::domain::{Decimal, FeeType, Money, MoneyError};

/// Where the base fee came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FeeBasis {
    /// A tier covered the amount.
    #[serde(rename_all = "camelCase")]
    Tier {
        min_amount: Decimal,
        max_amount: Option<Decimal>,
        fee_amount: Decimal,
    },
    /// No tier covered the amount; the configuration's fee type formula ran.
    #[serde(rename_all = "camelCase")]
    Formula { fee_type: FeeType },
}

/// Result of pricing one amount against one rule, before the bearer split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeComputation {
    /// Final fee, clamped and rounded half-up to 2 dp.
    pub fee: Money,
    /// Fee before minimum, cap and rounding.
    pub raw_fee: Decimal,
    pub basis: FeeBasis,
    pub percentage_component: Decimal,
    pub flat_component: Decimal,
    pub flat_fee_waived: bool,
    pub minimum_fee_applied: bool,
    pub fee_cap_applied: bool,
}

pub struct FeeCalculator;

impl FeeCalculator {
    /// Price `amount` under `rule`.
    ///
    /// A tier containing the amount supplies the base fee; an amount outside every
    /// tier falls back to the fee type formula. The minimum is applied before the cap.
    ///
    /// # Errors
    /// Fails on a negative amount or one in a different currency from the rule.
    pub fn compute(rule: &ConfiguredRule, amount: &Money) -> Result<FeeComputation, FeeError> {
        let config = &rule.configuration;
        let currency = config.currency();
        if amount.currency != currency {
            return Err(MoneyError::CurrencyMismatch {
                left: amount.currency,
                right: currency,
            }
            .into());
        }
        if amount.is_negative() {
            return Err(FeeError::NegativeAmount);
        }

        let mut percentage_component = Decimal::zero();
        let mut flat_component = Decimal::zero();
        let mut flat_fee_waived = false;

        let basis = match rule.tiers.iter().find(|tier| tier.applies_to(amount)) {
            Some(tier) => {
                flat_component = tier.fee_amount.amount;
                FeeBasis::Tier {
                    min_amount: tier.min_amount.amount,
                    max_amount: tier.max_amount.map(|m| m.amount),
                    fee_amount: tier.fee_amount.amount,
                }
            }
            None => {
                match config.fee_type {
                    FeeType::Flat => flat_component = config.flat_fee.amount,
                    FeeType::Percentage => {
                        percentage_component = percentage_of(amount, config.percentage_fee)?
                    }
                    FeeType::Hybrid => {
                        percentage_component = percentage_of(amount, config.percentage_fee)?;
                        flat_fee_waived = config
                            .waiver_threshold
                            .map_or(false, |threshold| amount.amount < threshold.amount);
                        if !flat_fee_waived {
                            flat_component = config.flat_fee.amount;
                        }
                    }
                }
                FeeBasis::Formula {
                    fee_type: config.fee_type,
                }
            }
        };

        let raw_fee = percentage_component
            .checked_add(flat_component)
            .ok_or(MoneyError::Overflow)?;
        let mut fee = raw_fee;

        let mut minimum_fee_applied = false;
        if let Some(minimum) = &config.minimum_fee {
            if fee < minimum.amount {
                fee = minimum.amount;
                minimum_fee_applied = true;
            }
        }

        let mut fee_cap_applied = false;
        if let Some(cap) = &config.fee_cap {
            if fee > cap.amount {
                fee = cap.amount;
                fee_cap_applied = true;
            }
        }

        Ok(FeeComputation {
            fee: Money::rounded(fee, currency),
            raw_fee,
            basis,
            percentage_component,
            flat_component,
            flat_fee_waived,
            minimum_fee_applied,
            fee_cap_applied,
        })
    }
}

fn percentage_of(amount: &Money, percent: Decimal) -> Result<Decimal, MoneyError> {
    amount.amount.percent_of(percent).ok_or(MoneyError::Overflow)
}
