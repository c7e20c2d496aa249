//! Wire shapes shared by the handlers and the parsing helpers that feed them.
//!
//! Amounts travel as decimal strings in both directions.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use crate::domain::{
    CalculationMethod, ConfigurationId, Currency, Decimal, FeeBearer, FeeHistory, FeeTier,
    FeeType, HistoryId, Money, PaymentChannel, TierId, Transaction, TransactionId,
    TransactionType, WalletId,
};
use crate::engine::{ConfiguredRule, FeeAllocation, FeeResolution};
use crate::error::AppError;

// =========================================================================
// Parsing helpers
// =========================================================================

pub fn parse_field<T>(field: &str, value: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    T::from_str(value.trim()).map_err(|e| AppError::BadRequest(format!("Invalid {field}: {e}")))
}

pub fn parse_optional_field<T>(field: &str, value: Option<&str>) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    value.map(|v| parse_field(field, v)).transpose()
}

pub fn parse_currency(value: Option<&str>, default: Currency) -> Result<Currency, AppError> {
    Ok(parse_optional_field("currency", value)?.unwrap_or(default))
}

pub fn parse_money(field: &str, value: &str, currency: Currency) -> Result<Money, AppError> {
    let amount: Decimal = parse_field(field, value)?;
    Money::new(amount, currency).map_err(|e| AppError::BadRequest(format!("Invalid {field}: {e}")))
}

pub fn parse_optional_money(
    field: &str,
    value: Option<&str>,
    currency: Currency,
) -> Result<Option<Money>, AppError> {
    value.map(|v| parse_money(field, v, currency)).transpose()
}

// =========================================================================
// Requests
// =========================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierInput {
    pub min_amount: Option<String>,
    pub max_amount: Option<String>,
    pub fee_amount: String,
}

impl TierInput {
    pub fn into_tier(
        self,
        configuration_id: ConfigurationId,
        currency: Currency,
    ) -> Result<FeeTier, AppError> {
        let min_amount = match self.min_amount.as_deref() {
            Some(v) => parse_money("minAmount", v, currency)?,
            None => Money::zero(currency),
        };
        Ok(FeeTier::new(
            configuration_id,
            min_amount,
            parse_optional_money("maxAmount", self.max_amount.as_deref(), currency)?,
            parse_money("feeAmount", &self.fee_amount, currency)?,
        ))
    }
}

pub fn parse_tiers(
    inputs: Vec<TierInput>,
    configuration_id: ConfigurationId,
    currency: Currency,
) -> Result<Vec<FeeTier>, AppError> {
    inputs
        .into_iter()
        .map(|t| t.into_tier(configuration_id, currency))
        .collect()
}

// =========================================================================
// Responses
// =========================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierDto {
    pub id: TierId,
    pub min_amount: String,
    pub max_amount: Option<String>,
    pub fee_amount: String,
}

impl From<&FeeTier> for TierDto {
    fn from(t: &FeeTier) -> Self {
        Self {
            id: t.id,
            min_amount: t.min_amount.amount_string(),
            max_amount: t.max_amount.map(|m| m.amount_string()),
            fee_amount: t.fee_amount.amount_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationDto {
    pub id: ConfigurationId,
    pub name: String,
    pub description: Option<String>,
    pub wallet_id: Option<WalletId>,
    pub transaction_type: TransactionType,
    pub payment_channel: Option<PaymentChannel>,
    pub fee_type: FeeType,
    pub percentage_fee: String,
    pub flat_fee: String,
    pub fee_cap: Option<String>,
    pub minimum_fee: Option<String>,
    pub waiver_threshold: Option<String>,
    pub currency: Currency,
    pub fee_bearer: FeeBearer,
    pub customer_percentage: String,
    pub merchant_percentage: String,
    pub is_active: bool,
    pub priority: i32,
    pub valid_from: Option<i64>,
    pub valid_until: Option<i64>,
    pub metadata: serde_json::Value,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tiers: Option<Vec<TierDto>>,
}

impl ConfigurationDto {
    pub fn from_configuration(c: &crate::domain::FeeConfiguration) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            description: c.description.clone(),
            wallet_id: c.wallet_id,
            transaction_type: c.transaction_type,
            payment_channel: c.payment_channel,
            fee_type: c.fee_type,
            percentage_fee: c.percentage_fee.to_canonical_string(),
            flat_fee: c.flat_fee.amount_string(),
            fee_cap: c.fee_cap.map(|m| m.amount_string()),
            minimum_fee: c.minimum_fee.map(|m| m.amount_string()),
            waiver_threshold: c.waiver_threshold.map(|m| m.amount_string()),
            currency: c.currency(),
            fee_bearer: c.fee_bearer,
            customer_percentage: c.customer_percentage.to_canonical_string(),
            merchant_percentage: c.merchant_percentage.to_canonical_string(),
            is_active: c.is_active,
            priority: c.priority,
            valid_from: c.valid_from.map(|t| t.as_ms()),
            valid_until: c.valid_until.map(|t| t.as_ms()),
            metadata: c.metadata.clone(),
            created_at: c.created_at.as_ms(),
            updated_at: c.updated_at.as_ms(),
            tiers: None,
        }
    }
}

impl From<&ConfiguredRule> for ConfigurationDto {
    fn from(rule: &ConfiguredRule) -> Self {
        let mut dto = Self::from_configuration(&rule.configuration);
        dto.tiers = Some(rule.tiers.iter().map(TierDto::from).collect());
        dto
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationDto {
    pub fee_bearer: FeeBearer,
    pub fee: String,
    pub customer_fee: String,
    pub merchant_fee: String,
    pub platform_fee: String,
    pub customer_pays: String,
    pub merchant_receives: String,
    pub net_amount: String,
    pub total_amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_percentage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_percentage: Option<String>,
}

impl From<&FeeAllocation> for AllocationDto {
    fn from(a: &FeeAllocation) -> Self {
        Self {
            fee_bearer: a.bearer,
            fee: a.fee.amount_string(),
            customer_fee: a.customer_fee.amount_string(),
            merchant_fee: a.merchant_fee.amount_string(),
            platform_fee: a.platform_fee.amount_string(),
            customer_pays: a.customer_pays.amount_string(),
            merchant_receives: a.merchant_receives.amount_string(),
            net_amount: a.net_amount.amount_string(),
            total_amount: a.total_amount.amount_string(),
            customer_percentage: a.split.map(|s| s.customer.to_canonical_string()),
            merchant_percentage: a.split.map(|s| s.merchant.to_canonical_string()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionDto {
    pub calculation_method: CalculationMethod,
    pub configuration_id: Option<ConfigurationId>,
    pub amount: String,
    pub fee: String,
    pub currency: Currency,
    pub allocation: AllocationDto,
    pub breakdown: serde_json::Value,
}

impl From<&FeeResolution> for ResolutionDto {
    fn from(r: &FeeResolution) -> Self {
        Self {
            calculation_method: r.method,
            configuration_id: r.configuration_id,
            amount: r.request.amount.amount_string(),
            fee: r.fee().amount_string(),
            currency: r.fee().currency,
            allocation: AllocationDto::from(&r.allocation),
            breakdown: r.calculation_details(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub id: TransactionId,
    pub wallet_id: WalletId,
    pub reference: String,
    pub transaction_type: TransactionType,
    pub payment_channel: Option<PaymentChannel>,
    pub amount: String,
    pub fees: String,
    pub currency: Currency,
    pub fee_bearer: Option<FeeBearer>,
    pub created_at: i64,
}

impl From<&Transaction> for TransactionDto {
    fn from(t: &Transaction) -> Self {
        Self {
            id: t.id,
            wallet_id: t.wallet_id,
            reference: t.reference.clone(),
            transaction_type: t.transaction_type,
            payment_channel: t.payment_channel,
            amount: t.amount.amount_string(),
            fees: t.fees.amount_string(),
            currency: t.amount.currency,
            fee_bearer: t.fee_bearer,
            created_at: t.created_at.as_ms(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryDto {
    pub id: HistoryId,
    pub transaction_id: TransactionId,
    pub configuration_id: Option<ConfigurationId>,
    pub calculation_method: CalculationMethod,
    pub original_amount: String,
    pub calculated_fee: String,
    pub currency: Currency,
    pub fee_bearer: FeeBearer,
    pub calculation_details: serde_json::Value,
    pub created_at: i64,
}

impl From<&FeeHistory> for HistoryDto {
    fn from(h: &FeeHistory) -> Self {
        Self {
            id: h.id,
            transaction_id: h.transaction_id,
            configuration_id: h.configuration_id,
            calculation_method: h.calculation_method,
            original_amount: h.original_amount.amount_string(),
            calculated_fee: h.calculated_fee.amount_string(),
            currency: h.calculated_fee.currency,
            fee_bearer: h.fee_bearer,
            calculation_details: h.calculation_details.clone(),
            created_at: h.created_at.as_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_money_rejects_sub_unit_precision() {
        assert!(parse_money("amount", "10.005", Currency::Ngn).is_err());
        assert_eq!(
            parse_money("amount", " 10.5 ", Currency::Ngn).unwrap(),
            Money::parse("10.50", "NGN").unwrap()
        );
    }

    #[test]
    fn test_parse_choice_error_names_field() {
        let err = parse_field::<TransactionType>("transactionType", "teleport").unwrap_err();
        assert!(err.to_string().contains("transactionType"));
    }

    #[test]
    fn test_tier_input_defaults_min_to_zero() {
        let input = TierInput {
            min_amount: None,
            max_amount: Some("5000".into()),
            fee_amount: "10".into(),
        };
        let tier = input
            .into_tier(ConfigurationId::new_v4(), Currency::Ngn)
            .unwrap();
        assert!(tier.min_amount.is_zero());
        assert_eq!(TierDto::from(&tier).max_amount.as_deref(), Some("5000.00"));
    }
}
