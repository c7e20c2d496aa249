//! Environment-configured default pricing.
//!
//! Each case is expressed as an in-memory configuration so it runs through the
//! same calculator as stored rules.

use super::{ConfiguredRule, FeeRequest};
use crate::config::{ChannelPricing, FeeSettings};
use crate::domain::{
    ConfigurationId, Currency, Decimal, FeeBearer, FeeConfiguration, FeeTier, FeeType, Money,
    PaymentChannel, TransactionType,
};
use uuid::Uuid;

pub struct SettingsSchedule;

impl SettingsSchedule {
    /// The settings rule for `request`, or `None` when the schedule charges nothing.
    pub fn rule_for(settings: &FeeSettings, request: &FeeRequest) -> Option<ConfiguredRule> {
        let currency = settings.currency;
        match request.transaction_type {
            TransactionType::Deposit => {
                let (name, pricing) = match request.payment_channel {
                    Some(PaymentChannel::IntlCard) => ("settings:intl_card", &settings.intl_card),
                    Some(PaymentChannel::Dva) => ("settings:dva", &settings.dva),
                    _ if settings.educational.enabled => {
                        return Some(ConfiguredRule::without_tiers(educational_card(settings)))
                    }
                    _ => ("settings:local_card", &settings.local_card),
                };
                Some(ConfiguredRule::without_tiers(hybrid(
                    name,
                    TransactionType::Deposit,
                    pricing,
                    settings.default_fee_bearer,
                    currency,
                )))
            }
            TransactionType::Withdrawal if settings.enable_transfer_fees => {
                Some(transfer_tiers(settings))
            }
            TransactionType::Transfer if settings.enable_internal_transfer_fees => {
                Some(ConfiguredRule::without_tiers(hybrid(
                    "settings:internal_transfer",
                    TransactionType::Transfer,
                    &settings.internal_transfer,
                    settings.default_fee_bearer,
                    currency,
                )))
            }
            _ => None,
        }
    }
}

fn base(name: &str, transaction_type: TransactionType, bearer: FeeBearer) -> FeeConfiguration {
    let mut config = FeeConfiguration::new(name, transaction_type);
    config.id = ConfigurationId(Uuid::nil());
    config.fee_bearer = bearer;
    config
}

fn hybrid(
    name: &str,
    transaction_type: TransactionType,
    pricing: &ChannelPricing,
    bearer: FeeBearer,
    currency: Currency,
) -> FeeConfiguration {
    let mut config = base(name, transaction_type, bearer);
    config.fee_type = FeeType::Hybrid;
    config.percentage_fee = pricing.percentage_fee;
    config.flat_fee = Money::rounded(pricing.flat_fee, currency);
    config.fee_cap = pricing.fee_cap.map(|cap| Money::rounded(cap, currency));
    config.waiver_threshold = pricing
        .waiver_threshold
        .map(|threshold| Money::rounded(threshold, currency));
    config
}

/// Percentage only: no flat fee and no waiver.
fn educational_card(settings: &FeeSettings) -> FeeConfiguration {
    let pricing = &settings.educational;
    let mut config = base(
        "settings:educational_card",
        TransactionType::Deposit,
        settings.default_fee_bearer,
    );
    config.fee_type = FeeType::Percentage;
    config.percentage_fee = pricing.card_percentage_fee;
    config.flat_fee = Money::zero(settings.currency);
    config.fee_cap = pricing
        .card_fee_cap
        .map(|cap| Money::rounded(cap, settings.currency));
    config
}

/// Withdrawal bands become contiguous tiers; the top band's fee also covers
/// anything above a bounded last band.
fn transfer_tiers(settings: &FeeSettings) -> ConfiguredRule {
    let currency = settings.currency;
    let mut config = base(
        "settings:transfer_tiers",
        TransactionType::Withdrawal,
        FeeBearer::Merchant,
    );
    config.fee_type = FeeType::Flat;
    if let Some(last) = settings.transfer_fee_tiers.last() {
        config.flat_fee = Money::rounded(last.fee, currency);
    }

    let step = Decimal::from_str_canonical("0.01").unwrap_or_default();
    let mut min = Decimal::zero();
    let mut tiers = Vec::with_capacity(settings.transfer_fee_tiers.len());
    for band in &settings.transfer_fee_tiers {
        let max = band.max_amount.map(|m| Money::rounded(m, currency));
        tiers.push(FeeTier::new(
            config.id,
            Money::rounded(min, currency),
            max,
            Money::rounded(band.fee, currency),
        ));
        if let Some(max) = max {
            match max.amount.checked_add(step) {
                Some(next) => min = next,
                None => break,
            }
        }
    }

    ConfiguredRule::new(config, tiers)
}
