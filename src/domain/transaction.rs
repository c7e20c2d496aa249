//! Minimal wallet and transaction rows the fee service binds to.
//!
//! Both entities belong to the wallet subsystem; only the columns fee
//! application reads or writes are modelled here.

use crate::domain::choices::{FeeBearer, PaymentChannel, TransactionType};
use crate::domain::money::Money;
use crate::domain::primitives::{TimeMs, TransactionId, WalletId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: WalletId,
    pub created_at: TimeMs,
}

impl Wallet {
    pub fn new() -> Self {
        Self {
            id: WalletId::new_v4(),
            created_at: TimeMs::now(),
        }
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub wallet_id: WalletId,
    pub reference: String,
    pub transaction_type: TransactionType,
    pub payment_channel: Option<PaymentChannel>,
    pub amount: Money,
    pub fees: Money,
    /// Nullable in storage; new rows default to platform.
    pub fee_bearer: Option<FeeBearer>,
    pub created_at: TimeMs,
}

impl Transaction {
    /// A fresh transaction with no fee applied yet.
    pub fn new(
        wallet_id: WalletId,
        reference: impl Into<String>,
        transaction_type: TransactionType,
        payment_channel: Option<PaymentChannel>,
        amount: Money,
    ) -> Self {
        Self {
            id: TransactionId::new_v4(),
            wallet_id,
            reference: reference.into(),
            transaction_type,
            payment_channel,
            amount,
            fees: Money::zero(amount.currency),
            fee_bearer: Some(FeeBearer::Platform),
            created_at: TimeMs::now(),
        }
    }
}
