//! Append-only fee audit records.

use crate::domain::choices::{CalculationMethod, FeeBearer};
use crate::domain::money::Money;
use crate::domain::primitives::{ConfigurationId, HistoryId, TimeMs, TransactionId};
use serde::{Deserialize, Serialize};

/// One fee computation, one-to-one with its transaction. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeHistory {
    pub id: HistoryId,
    pub transaction_id: TransactionId,
    /// Cleared when the configuration is deleted; the record itself survives.
    pub configuration_id: Option<ConfigurationId>,
    pub calculation_method: CalculationMethod,
    pub original_amount: Money,
    pub calculated_fee: Money,
    pub fee_bearer: FeeBearer,
    pub calculation_details: serde_json::Value,
    pub created_at: TimeMs,
}
