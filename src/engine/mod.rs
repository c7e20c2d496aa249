//! Pure fee resolution: matching, calculation, bearer split.
//!
//! Nothing in here touches the database; the same inputs always give the
//! same outputs.

use crate::domain::{
    FeeBearer, FeeConfiguration, FeeTier, Money, MoneyError, PaymentChannel, TimeMs,
    TransactionType, WalletId,
};
use thiserror::Error;

pub mod bearer;
pub mod calculator;
pub mod matcher;
pub mod resolver;
pub mod schedule;

pub use bearer::{FeeAllocation, SplitPercentages};
pub use calculator::{FeeBasis, FeeCalculator, FeeComputation};
pub use matcher::ConfigurationMatcher;
pub use resolver::{FeeResolution, FeeResolver};
pub use schedule::SettingsSchedule;

/// A configuration together with its tiers, ordered ascending by `min_amount`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfiguredRule {
    pub configuration: FeeConfiguration,
    pub tiers: Vec<FeeTier>,
}

impl ConfiguredRule {
    pub fn new(configuration: FeeConfiguration, mut tiers: Vec<FeeTier>) -> Self {
        crate::domain::sort_tiers(&mut tiers);
        Self {
            configuration,
            tiers,
        }
    }

    pub fn without_tiers(configuration: FeeConfiguration) -> Self {
        Self {
            configuration,
            tiers: Vec::new(),
        }
    }
}

/// What is being priced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeRequest {
    pub transaction_type: TransactionType,
    pub payment_channel: Option<PaymentChannel>,
    pub wallet_id: Option<WalletId>,
    pub amount: Money,
    pub at: TimeMs,
    /// Replaces the bearer the matched rule would assign.
    pub bearer_override: Option<FeeBearer>,
}

impl FeeRequest {
    pub fn new(transaction_type: TransactionType, amount: Money) -> Self {
        Self {
            transaction_type,
            payment_channel: None,
            wallet_id: None,
            amount,
            at: TimeMs::now(),
            bearer_override: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeeError {
    /// No active rule covers the request. Distinct from a zero fee.
    #[error("no applicable fee rule for {transaction_type} transactions")]
    NoApplicableRule {
        transaction_type: TransactionType,
        payment_channel: Option<PaymentChannel>,
        wallet_id: Option<WalletId>,
    },
    #[error("amount must not be negative")]
    NegativeAmount,
    #[error(transparent)]
    Money(#[from] MoneyError),
}
