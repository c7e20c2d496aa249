//! Closed choice sets shared by configurations, transactions and history rows.
//!
//! Every variant has a stable lowercase wire name used in JSON and in SQLite.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseChoiceError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! choice_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $wire)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseChoiceError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(ParseChoiceError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

choice_enum!(
    /// Kind of wallet transaction a fee rule applies to.
    TransactionType, "transaction type" {
        Deposit => "deposit",
        Withdrawal => "withdrawal",
        Transfer => "transfer",
        Payment => "payment",
        Refund => "refund",
        Reversal => "reversal",
    }
);

choice_enum!(
    /// Funding channel reported by the payment gateway.
    PaymentChannel, "payment channel" {
        LocalCard => "local_card",
        IntlCard => "intl_card",
        /// Dedicated virtual account.
        Dva => "dva",
        BankTransfer => "bank_transfer",
        Ussd => "ussd",
        Qr => "qr",
        MobileMoney => "mobile_money",
    }
);

choice_enum!(
    FeeType, "fee type" {
        Percentage => "percentage",
        Flat => "flat",
        /// Flat component plus percentage component.
        Hybrid => "hybrid",
    }
);

choice_enum!(
    /// Party that pays a computed fee.
    FeeBearer, "fee bearer" {
        Customer => "customer",
        Merchant => "merchant",
        Platform => "platform",
        Split => "split",
    }
);

choice_enum!(
    /// How a history row's fee was obtained.
    CalculationMethod, "calculation method" {
        /// A stored fee configuration matched.
        Database => "database",
        /// No stored configuration matched; the settings schedule was used.
        Settings => "settings",
        /// Fees are switched off; the fee is zero by policy.
        Disabled => "disabled",
        /// Reconstructed from an existing transaction row.
        Backfill => "backfill",
    }
);

impl Default for FeeType {
    fn default() -> Self {
        FeeType::Hybrid
    }
}

impl Default for FeeBearer {
    fn default() -> Self {
        FeeBearer::Platform
    }
}
