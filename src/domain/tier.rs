//! Amount-range overrides owned by a fee configuration.

use crate::domain::configuration::{check_money, ValidationError};
use crate::domain::money::{Currency, Money};
use crate::domain::primitives::{ConfigurationId, TierId, TimeMs};
use serde::{Deserialize, Serialize};

/// A flat fee for amounts in `[min_amount, max_amount]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeTier {
    pub id: TierId,
    pub configuration_id: ConfigurationId,
    pub min_amount: Money,
    /// Inclusive upper bound; `None` is unbounded.
    pub max_amount: Option<Money>,
    pub fee_amount: Money,
    pub created_at: TimeMs,
}

impl FeeTier {
    pub fn new(
        configuration_id: ConfigurationId,
        min_amount: Money,
        max_amount: Option<Money>,
        fee_amount: Money,
    ) -> Self {
        Self {
            id: TierId::new_v4(),
            configuration_id,
            min_amount,
            max_amount,
            fee_amount,
            created_at: TimeMs::now(),
        }
    }

    /// Both bounds are inclusive.
    pub fn applies_to(&self, amount: &Money) -> bool {
        if amount.currency != self.min_amount.currency || amount.amount < self.min_amount.amount {
            return false;
        }
        match &self.max_amount {
            Some(max) => amount.amount <= max.amount,
            None => true,
        }
    }
}

/// Order a tier set ascending by `min_amount`.
pub fn sort_tiers(tiers: &mut [FeeTier]) {
    tiers.sort_by(|a, b| a.min_amount.amount.cmp(&b.min_amount.amount));
}

/// Validate a complete tier set for one configuration.
///
/// Indices in errors refer to positions after sorting by `min_amount`.
///
/// # Errors
/// Returns the first violated rule: currency or precision, an inverted range,
/// an unbounded tier that is not the highest, or two overlapping ranges.
pub fn validate_tiers(tiers: &[FeeTier], currency: Currency) -> Result<(), ValidationError> {
    let mut sorted: Vec<&FeeTier> = tiers.iter().collect();
    sorted.sort_by(|a, b| a.min_amount.amount.cmp(&b.min_amount.amount));

    for (index, tier) in sorted.iter().enumerate() {
        check_money("min_amount", &tier.min_amount, currency)?;
        check_money("fee_amount", &tier.fee_amount, currency)?;
        if let Some(max) = &tier.max_amount {
            check_money("max_amount", max, currency)?;
            if max.amount < tier.min_amount.amount {
                return Err(ValidationError::TierRange { index });
            }
        }
    }

    for (index, pair) in sorted.windows(2).enumerate() {
        let (lower, upper) = (pair[0], pair[1]);
        match &lower.max_amount {
            None => return Err(ValidationError::UnboundedTierNotLast { index }),
            Some(max) if max.amount >= upper.min_amount.amount => {
                return Err(ValidationError::TierOverlap {
                    first: index,
                    second: index + 1,
                })
            }
            Some(_) => {}
        }
    }

    Ok(())
}
