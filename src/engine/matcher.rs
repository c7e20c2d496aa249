use std::cmp::Ordering;

use tracing::debug;

use super::{ConfiguredRule, FeeRequest};
use crate::domain::FeeConfiguration;

/// Selects the single rule that prices a request.
pub struct ConfigurationMatcher;

impl ConfigurationMatcher {
    /// Whether `config` is eligible for `request` at all.
    ///
    /// Unset channel and unset wallet on the configuration act as wildcards.
    pub fn is_candidate(config: &FeeConfiguration, request: &FeeRequest) -> bool {
        if !config.is_active || config.transaction_type != request.transaction_type {
            return false;
        }

        let channel_ok = match config.payment_channel {
            None => true,
            Some(channel) => request.payment_channel == Some(channel),
        };
        let wallet_ok = match config.wallet_id {
            None => true,
            Some(wallet) => request.wallet_id == Some(wallet),
        };

        channel_ok && wallet_ok && config.is_valid_at(request.at)
    }

    /// Rank two eligible rules; `Ordering::Less` means `a` wins.
    ///
    /// Wallet-specific beats global, then higher priority, then newer `created_at`.
    /// The id comparison only makes the order total.
    pub fn rank(a: &FeeConfiguration, b: &FeeConfiguration) -> Ordering {
        b.wallet_id
            .is_some()
            .cmp(&a.wallet_id.is_some())
            .then_with(|| b.priority.cmp(&a.priority))
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| b.id.cmp(&a.id))
    }

    /// Pick the best eligible rule, or `None` when nothing applies.
    pub fn select<'a>(
        candidates: &'a [ConfiguredRule],
        request: &FeeRequest,
    ) -> Option<&'a ConfiguredRule> {
        let selected = candidates
            .iter()
            .filter(|rule| Self::is_candidate(&rule.configuration, request))
            .min_by(|a, b| Self::rank(&a.configuration, &b.configuration));

        debug!(
            transaction_type = %request.transaction_type,
            candidates = candidates.len(),
            selected = ?selected.map(|rule| rule.configuration.id),
            "Fee configuration match"
        );

        selected
    }
}
