//! Domain types for the fee resolution model.
//!
//! This module provides:
//! - Lossless decimal and currency-tagged money values
//! - Closed choice sets (transaction type, channel, fee type, bearer)
//! - FeeConfiguration, FeeTier and FeeHistory with save-time validation
//! - The minimal wallet/transaction rows fees are applied to

pub mod choices;
pub mod configuration;
pub mod decimal;
pub mod history;
pub mod money;
pub mod primitives;
pub mod tier;
pub mod transaction;

pub use choices::{
    CalculationMethod, FeeBearer, FeeType, ParseChoiceError, PaymentChannel, TransactionType,
};
pub use configuration::{FeeConfiguration, ValidationError};
pub use decimal::Decimal;
pub use history::FeeHistory;
pub use money::{Currency, Money, MoneyError};
pub use primitives::{ConfigurationId, HistoryId, TierId, TimeMs, TransactionId, WalletId};
pub use tier::{sort_tiers, validate_tiers, FeeTier};
pub use transaction::{Transaction, Wallet};
