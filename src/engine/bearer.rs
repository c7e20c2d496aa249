use serde::Serialize;

use crate::domain::{Decimal, FeeBearer, Money, MoneyError, ValidationError};

/// Customer/merchant shares of a split fee. Always sums to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitPercentages {
    pub customer: Decimal,
    pub merchant: Decimal,
}

impl SplitPercentages {
    /// # Errors
    /// Rejects shares outside 0–100 or not summing to exactly 100.
    pub fn new(customer: Decimal, merchant: Decimal) -> Result<Self, ValidationError> {
        for (field, value) in [
            ("customer_percentage", customer),
            ("merchant_percentage", merchant),
        ] {
            if value.is_negative() || value > Decimal::hundred() {
                return Err(ValidationError::PercentageOutOfRange { field, value });
            }
        }
        if customer.checked_add(merchant) != Some(Decimal::hundred()) {
            return Err(ValidationError::SplitPercentagesSum { customer, merchant });
        }
        Ok(Self { customer, merchant })
    }

    pub fn even() -> Self {
        Self {
            customer: Decimal::from(50),
            merchant: Decimal::from(50),
        }
    }
}

/// Who pays what once a fee is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeAllocation {
    pub bearer: FeeBearer,
    pub fee: Money,
    pub customer_fee: Money,
    pub merchant_fee: Money,
    pub platform_fee: Money,
    /// Amount debited from the customer.
    pub customer_pays: Money,
    /// Amount credited to the merchant.
    pub merchant_receives: Money,
    pub net_amount: Money,
    pub total_amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split: Option<SplitPercentages>,
}

impl FeeAllocation {
    /// Assign `fee` on `amount` to the bearer.
    ///
    /// For a split the customer share is rounded half-up and the merchant takes
    /// the remainder, so the two shares always add back to `fee`.
    ///
    /// # Errors
    /// Fails when `amount` and `fee` are in different currencies.
    pub fn resolve(
        amount: &Money,
        fee: &Money,
        bearer: FeeBearer,
        split: SplitPercentages,
    ) -> Result<Self, MoneyError> {
        let zero = Money::zero(fee.currency);
        let (customer_fee, merchant_fee, platform_fee) = match bearer {
            FeeBearer::Customer => (*fee, zero, zero),
            FeeBearer::Merchant => (zero, *fee, zero),
            FeeBearer::Platform => (zero, zero, *fee),
            FeeBearer::Split => {
                let customer_share = fee
                    .amount
                    .percent_of(split.customer)
                    .ok_or(MoneyError::Overflow)?;
                let customer_fee = Money::rounded(customer_share, fee.currency);
                let merchant_fee = fee.checked_sub(&customer_fee)?;
                (customer_fee, merchant_fee, zero)
            }
        };

        let customer_pays = amount.checked_add(&customer_fee)?;
        let merchant_receives = amount.checked_sub(&merchant_fee)?;
        let (net_amount, total_amount) = match bearer {
            FeeBearer::Customer => (*amount, customer_pays),
            FeeBearer::Merchant => (merchant_receives, *amount),
            FeeBearer::Platform => (*amount, *amount),
            FeeBearer::Split => (merchant_receives, customer_pays),
        };

        Ok(Self {
            bearer,
            fee: *fee,
            customer_fee,
            merchant_fee,
            platform_fee,
            customer_pays,
            merchant_receives,
            net_amount,
            total_amount,
            split: (bearer == FeeBearer::Split).then_some(split),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ngn(s: &str) -> Money {
        Money::parse(s, "NGN").unwrap()
    }

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_customer_bearer_pays_everything() {
        let a = FeeAllocation::resolve(&ngn("1000"), &ngn("15"), FeeBearer::Customer, SplitPercentages::even())
            .unwrap();
        assert_eq!(a.customer_fee, ngn("15"));
        assert_eq!(a.customer_pays, ngn("1015"));
        assert_eq!(a.merchant_receives, ngn("1000"));
        assert_eq!(a.total_amount, ngn("1015"));
        assert_eq!(a.split, None);
    }

    #[test]
    fn test_merchant_bearer_absorbs() {
        let a = FeeAllocation::resolve(&ngn("1000"), &ngn("15"), FeeBearer::Merchant, SplitPercentages::even())
            .unwrap();
        assert_eq!(a.customer_pays, ngn("1000"));
        assert_eq!(a.merchant_fee, ngn("15"));
        assert_eq!(a.merchant_receives, ngn("985"));
        assert_eq!(a.net_amount, ngn("985"));
    }

    #[test]
    fn test_platform_bearer_leaves_amounts_untouched() {
        let a = FeeAllocation::resolve(&ngn("1000"), &ngn("15"), FeeBearer::Platform, SplitPercentages::even())
            .unwrap();
        assert_eq!(a.customer_pays, ngn("1000"));
        assert_eq!(a.merchant_receives, ngn("1000"));
        assert_eq!(a.platform_fee, ngn("15"));
        assert!(a.customer_fee.is_zero() && a.merchant_fee.is_zero());
    }

    #[test]
    fn test_split_thirty_seventy() {
        let split = SplitPercentages::new(d("30"), d("70")).unwrap();
        let a = FeeAllocation::resolve(&ngn("2000"), &ngn("80"), FeeBearer::Split, split).unwrap();
        assert_eq!(a.customer_fee, ngn("24"));
        assert_eq!(a.merchant_fee, ngn("56"));
        assert_eq!(a.customer_pays, ngn("2024"));
        assert_eq!(a.merchant_receives, ngn("1944"));
        assert_eq!(a.split, Some(split));
    }

    #[test]
    fn test_split_remainder_keeps_total() {
        let split = SplitPercentages::new(d("33.33"), d("66.67")).unwrap();
        let a = FeeAllocation::resolve(&ngn("100"), &ngn("0.10"), FeeBearer::Split, split).unwrap();
        // 0.10 * 33.33% = 0.03333 -> 0.03
        assert_eq!(a.customer_fee, ngn("0.03"));
        assert_eq!(a.merchant_fee, ngn("0.07"));
        assert_eq!(a.customer_fee.checked_add(&a.merchant_fee).unwrap(), ngn("0.10"));
    }

    #[test]
    fn test_split_percentages_validation() {
        assert!(SplitPercentages::new(d("40"), d("60")).is_ok());
        assert!(matches!(
            SplitPercentages::new(d("40"), d("50")),
            Err(ValidationError::SplitPercentagesSum { .. })
        ));
        assert!(matches!(
            SplitPercentages::new(d("-10"), d("110")),
            Err(ValidationError::PercentageOutOfRange { .. })
        ));
    }
}
