use serde_json::json;

use super::{
    ConfigurationMatcher, ConfiguredRule, FeeAllocation, FeeCalculator, FeeComputation, FeeError,
    FeeRequest, SettingsSchedule, SplitPercentages,
};
use crate::config::FeeSettings;
use crate::domain::{
    CalculationMethod, ConfigurationId, FeeBearer, FeeHistory, HistoryId, Money, MoneyError,
    TimeMs, TransactionId,
};

/// Outcome of pricing one request end to end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeResolution {
    pub request: FeeRequest,
    pub method: CalculationMethod,
    /// Set only when a stored configuration matched.
    pub configuration_id: Option<ConfigurationId>,
    pub configuration_name: Option<String>,
    /// `None` when the fee is zero by policy (fees disabled, unpriced settings case).
    pub computation: Option<FeeComputation>,
    pub allocation: FeeAllocation,
}

impl FeeResolution {
    pub fn fee(&self) -> Money {
        self.allocation.fee
    }

    pub fn bearer(&self) -> FeeBearer {
        self.allocation.bearer
    }

    /// Structured breakdown stored on the history row.
    pub fn calculation_details(&self) -> serde_json::Value {
        let request = &self.request;
        let mut details = json!({
            "transactionType": request.transaction_type,
            "paymentChannel": request.payment_channel,
            "walletId": request.wallet_id,
            "evaluatedAt": request.at.as_ms(),
            "configurationName": self.configuration_name,
            "bearerOverridden": request.bearer_override.is_some(),
            "allocation": self.allocation,
        });

        if let Some(c) = &self.computation {
            details["basis"] = json!(c.basis);
            details["percentageComponent"] = json!(c.percentage_component);
            details["flatComponent"] = json!(c.flat_component);
            details["flatFeeWaived"] = json!(c.flat_fee_waived);
            details["rawFee"] = json!(c.raw_fee);
            details["minimumFeeApplied"] = json!(c.minimum_fee_applied);
            details["feeCapApplied"] = json!(c.fee_cap_applied);
        }

        details
    }

    /// The immutable audit record for this resolution.
    pub fn to_history(&self, transaction_id: TransactionId, created_at: TimeMs) -> FeeHistory {
        FeeHistory {
            id: HistoryId::new_v4(),
            transaction_id,
            configuration_id: self.configuration_id,
            calculation_method: self.method,
            original_amount: self.request.amount,
            calculated_fee: self.fee(),
            fee_bearer: self.bearer(),
            calculation_details: self.calculation_details(),
            created_at,
        }
    }
}

/// Combines matcher, calculator, settings schedule and bearer split under the fee policy.
#[derive(Debug, Clone)]
pub struct FeeResolver {
    settings: FeeSettings,
}

impl FeeResolver {
    pub fn new(settings: FeeSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &FeeSettings {
        &self.settings
    }

    fn default_split(&self) -> SplitPercentages {
        SplitPercentages::new(
            self.settings.split_customer_percentage,
            self.settings.split_merchant_percentage,
        )
        .unwrap_or_else(|_| SplitPercentages::even())
    }

    /// Price `request` against `candidates`.
    ///
    /// # Errors
    /// `FeeError::NoApplicableRule` when nothing matches and the settings
    /// fallback is off; money errors on a negative or foreign-currency amount.
    pub fn resolve(
        &self,
        candidates: &[ConfiguredRule],
        request: &FeeRequest,
    ) -> Result<FeeResolution, FeeError> {
        if request.amount.currency != self.settings.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: request.amount.currency,
                right: self.settings.currency,
            }
            .into());
        }
        if request.amount.is_negative() {
            return Err(FeeError::NegativeAmount);
        }

        if !self.settings.enable_fees {
            let bearer = request
                .bearer_override
                .unwrap_or(self.settings.default_fee_bearer);
            return self.finish(request, CalculationMethod::Disabled, None, None, bearer, None);
        }

        if let Some(rule) = ConfigurationMatcher::select(candidates, request) {
            let config = &rule.configuration;
            let computation = FeeCalculator::compute(rule, &request.amount)?;
            let bearer = request.bearer_override.unwrap_or(config.fee_bearer);
            let split = SplitPercentages::new(config.customer_percentage, config.merchant_percentage)
                .unwrap_or_else(|_| self.default_split());
            return self.finish(
                request,
                CalculationMethod::Database,
                Some(rule),
                Some(computation),
                bearer,
                Some(split),
            );
        }

        if !self.settings.use_settings_fallback {
            return Err(FeeError::NoApplicableRule {
                transaction_type: request.transaction_type,
                payment_channel: request.payment_channel,
                wallet_id: request.wallet_id,
            });
        }

        match SettingsSchedule::rule_for(&self.settings, request) {
            Some(rule) => {
                let computation = FeeCalculator::compute(&rule, &request.amount)?;
                let bearer = request
                    .bearer_override
                    .unwrap_or(rule.configuration.fee_bearer);
                self.finish(
                    request,
                    CalculationMethod::Settings,
                    None,
                    Some(computation),
                    bearer,
                    None,
                )
            }
            None => {
                let bearer = request
                    .bearer_override
                    .unwrap_or(self.settings.default_fee_bearer);
                self.finish(request, CalculationMethod::Settings, None, None, bearer, None)
            }
        }
    }

    fn finish(
        &self,
        request: &FeeRequest,
        method: CalculationMethod,
        stored: Option<&ConfiguredRule>,
        computation: Option<FeeComputation>,
        bearer: FeeBearer,
        split: Option<SplitPercentages>,
    ) -> Result<FeeResolution, FeeError> {
        let fee = computation
            .as_ref()
            .map(|c| c.fee)
            .unwrap_or_else(|| Money::zero(request.amount.currency));
        let split = split.unwrap_or_else(|| self.default_split());
        let allocation = FeeAllocation::resolve(&request.amount, &fee, bearer, split)?;

        Ok(FeeResolution {
            request: request.clone(),
            method,
            configuration_id: stored.map(|rule| rule.configuration.id),
            configuration_name: stored.map(|rule| rule.configuration.name.clone()),
            computation,
            allocation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decimal, FeeConfiguration, FeeType, TransactionType};

    fn ngn(s: &str) -> Money {
        Money::parse(s, "NGN").unwrap()
    }

    fn hybrid_rule() -> ConfiguredRule {
        let mut config = FeeConfiguration::new("hybrid", TransactionType::Deposit);
        config.fee_type = FeeType::Hybrid;
        config.flat_fee = ngn("50");
        config.percentage_fee = Decimal::from_str_canonical("1.5").unwrap();
        config.fee_bearer = FeeBearer::Customer;
        ConfiguredRule::without_tiers(config)
    }

    #[test]
    fn test_no_rule_is_an_error_not_zero() {
        let resolver = FeeResolver::new(FeeSettings::default());
        let request = FeeRequest::new(TransactionType::Refund, ngn("100"));
        assert_eq!(
            resolver.resolve(&[], &request),
            Err(FeeError::NoApplicableRule {
                transaction_type: TransactionType::Refund,
                payment_channel: None,
                wallet_id: None,
            })
        );
    }

    #[test]
    fn test_settings_fallback_when_enabled() {
        let settings = FeeSettings {
            use_settings_fallback: true,
            ..FeeSettings::default()
        };
        let resolver = FeeResolver::new(settings);

        let request = FeeRequest::new(TransactionType::Withdrawal, ngn("10000"));
        let resolution = resolver.resolve(&[], &request).unwrap();
        assert_eq!(resolution.method, CalculationMethod::Settings);
        assert_eq!(resolution.fee(), ngn("25"));
        assert_eq!(resolution.bearer(), FeeBearer::Merchant);
        assert_eq!(resolution.configuration_id, None);

        let refund = FeeRequest::new(TransactionType::Refund, ngn("100"));
        let resolution = resolver.resolve(&[], &refund).unwrap();
        assert!(resolution.fee().is_zero());
        assert_eq!(resolution.computation, None);
    }

    #[test]
    fn test_disabled_fees_are_zero_by_policy() {
        let settings = FeeSettings {
            enable_fees: false,
            ..FeeSettings::default()
        };
        let resolver = FeeResolver::new(settings);
        let request = FeeRequest::new(TransactionType::Deposit, ngn("1000"));
        let resolution = resolver.resolve(&[hybrid_rule()], &request).unwrap();
        assert_eq!(resolution.method, CalculationMethod::Disabled);
        assert!(resolution.fee().is_zero());
    }

    #[test]
    fn test_database_rule_and_bearer_override() {
        let resolver = FeeResolver::new(FeeSettings::default());
        let rule = hybrid_rule();
        let mut request = FeeRequest::new(TransactionType::Deposit, ngn("2000"));

        let resolution = resolver.resolve(&[rule.clone()], &request).unwrap();
        assert_eq!(resolution.method, CalculationMethod::Database);
        assert_eq!(resolution.configuration_id, Some(rule.configuration.id));
        assert_eq!(resolution.fee(), ngn("80"));
        assert_eq!(resolution.allocation.customer_pays, ngn("2080"));

        request.bearer_override = Some(FeeBearer::Split);
        let resolution = resolver.resolve(&[rule], &request).unwrap();
        assert_eq!(resolution.bearer(), FeeBearer::Split);
        assert_eq!(resolution.allocation.customer_fee, ngn("40"));
        assert_eq!(resolution.allocation.merchant_fee, ngn("40"));
    }

    #[test]
    fn test_negative_amount_rejected_before_matching() {
        let resolver = FeeResolver::new(FeeSettings::default());
        let request = FeeRequest::new(TransactionType::Deposit, ngn("-5"));
        assert_eq!(
            resolver.resolve(&[hybrid_rule()], &request),
            Err(FeeError::NegativeAmount)
        );
    }

    #[test]
    fn test_overflowing_allocation_is_an_error() {
        let mut config = FeeConfiguration::new("flat", TransactionType::Payment);
        config.fee_type = FeeType::Flat;
        config.flat_fee = ngn("10");
        config.fee_bearer = FeeBearer::Customer;
        let resolver = FeeResolver::new(FeeSettings::default());
        let request = FeeRequest::new(
            TransactionType::Payment,
            ngn("79228162514264337593543950335"),
        );

        assert_eq!(
            resolver.resolve(&[ConfiguredRule::without_tiers(config)], &request),
            Err(FeeError::Money(MoneyError::Overflow))
        );
    }

    #[test]
    fn test_history_record_captures_breakdown() {
        let resolver = FeeResolver::new(FeeSettings::default());
        let request = FeeRequest::new(TransactionType::Deposit, ngn("2000"));
        let resolution = resolver.resolve(&[hybrid_rule()], &request).unwrap();

        let tx_id = TransactionId::new_v4();
        let history = resolution.to_history(tx_id, TimeMs::new(42));
        assert_eq!(history.transaction_id, tx_id);
        assert_eq!(history.calculated_fee, ngn("80"));
        assert_eq!(history.original_amount, ngn("2000"));
        assert_eq!(history.fee_bearer, FeeBearer::Customer);
        assert_eq!(history.calculation_method, CalculationMethod::Database);
        let raw = history.calculation_details["rawFee"].as_str().unwrap();
        assert_eq!(Decimal::from_str_canonical(raw).unwrap(), Decimal::from(80));
        assert_eq!(history.calculation_details["allocation"]["bearer"], "customer");
        assert_eq!(history.calculation_details["flatFeeWaived"], false);
        assert_eq!(history.calculation_details["basis"]["kind"], "formula");
    }
}
