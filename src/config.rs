use crate::domain::{Currency, Decimal, FeeBearer};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub fees: FeeSettings,
}

/// Percentage + flat pricing for one settings-schedule channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPricing {
    pub percentage_fee: Decimal,
    pub flat_fee: Decimal,
    pub fee_cap: Option<Decimal>,
    pub waiver_threshold: Option<Decimal>,
}

/// One withdrawal band of the settings schedule: amounts up to `max_amount` pay `fee`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferFeeTier {
    pub max_amount: Option<Decimal>,
    pub fee: Decimal,
}

/// Reduced card pricing for educational institutions: percentage only, capped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EducationalPricing {
    pub enabled: bool,
    pub card_percentage_fee: Decimal,
    pub card_fee_cap: Option<Decimal>,
    /// Read for configuration parity. No deposit channel is priced by it.
    pub other_flat_fee: Decimal,
}

/// Fee policy switches and the settings schedule used when no stored rule matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeSettings {
    pub currency: Currency,
    pub enable_fees: bool,
    pub use_settings_fallback: bool,
    pub default_fee_bearer: FeeBearer,
    pub split_customer_percentage: Decimal,
    pub split_merchant_percentage: Decimal,
    pub local_card: ChannelPricing,
    pub intl_card: ChannelPricing,
    pub dva: ChannelPricing,
    pub enable_transfer_fees: bool,
    pub transfer_fee_tiers: Vec<TransferFeeTier>,
    pub enable_internal_transfer_fees: bool,
    pub internal_transfer: ChannelPricing,
    pub educational: EducationalPricing,
}

impl Default for FeeSettings {
    /// Paystack's published NGN pricing.
    fn default() -> Self {
        Self {
            currency: Currency::Ngn,
            enable_fees: true,
            use_settings_fallback: false,
            default_fee_bearer: FeeBearer::Platform,
            split_customer_percentage: Decimal::from(50),
            split_merchant_percentage: Decimal::from(50),
            local_card: ChannelPricing {
                percentage_fee: dec("1.5"),
                flat_fee: Decimal::from(100),
                fee_cap: Some(Decimal::from(2000)),
                waiver_threshold: Some(Decimal::from(2500)),
            },
            intl_card: ChannelPricing {
                percentage_fee: dec("3.9"),
                flat_fee: Decimal::from(100),
                fee_cap: None,
                waiver_threshold: None,
            },
            dva: ChannelPricing {
                percentage_fee: Decimal::from(1),
                flat_fee: Decimal::zero(),
                fee_cap: Some(Decimal::from(300)),
                waiver_threshold: None,
            },
            enable_transfer_fees: true,
            transfer_fee_tiers: vec![
                TransferFeeTier {
                    max_amount: Some(Decimal::from(5000)),
                    fee: Decimal::from(10),
                },
                TransferFeeTier {
                    max_amount: Some(Decimal::from(50000)),
                    fee: Decimal::from(25),
                },
                TransferFeeTier {
                    max_amount: None,
                    fee: Decimal::from(50),
                },
            ],
            enable_internal_transfer_fees: false,
            internal_transfer: ChannelPricing {
                percentage_fee: Decimal::zero(),
                flat_fee: Decimal::zero(),
                fee_cap: None,
                waiver_threshold: None,
            },
            educational: EducationalPricing {
                enabled: false,
                card_percentage_fee: dec("0.7"),
                card_fee_cap: Some(Decimal::from(1500)),
                other_flat_fee: Decimal::from(300),
            },
        }
    }
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap_or_default()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let fees = parse_fee_settings_from_map(&env_map)?;

        Ok(Config {
            port,
            database_path,
            fees,
        })
    }
}

fn parse_fee_settings_from_map(
    env_map: &HashMap<String, String>,
) -> Result<FeeSettings, ConfigError> {
    let defaults = FeeSettings::default();

    let currency = match env_map.get("WALLET_CURRENCY") {
        Some(code) => Currency::from_str(code).map_err(|e| {
            ConfigError::InvalidValue("WALLET_CURRENCY".to_string(), e.to_string())
        })?,
        None => defaults.currency,
    };

    let default_fee_bearer = match env_map.get("WALLET_DEFAULT_FEE_BEARER") {
        Some(s) => FeeBearer::from_str(s).map_err(|_| {
            ConfigError::InvalidValue(
                "WALLET_DEFAULT_FEE_BEARER".to_string(),
                format!("must be customer, merchant, platform, or split, got {}", s),
            )
        })?,
        None => defaults.default_fee_bearer,
    };

    let split_customer_percentage = decimal_or(
        env_map,
        "WALLET_FEE_SPLIT_CUSTOMER_PERCENTAGE",
        defaults.split_customer_percentage,
    )?;
    let split_merchant_percentage = decimal_or(
        env_map,
        "WALLET_FEE_SPLIT_MERCHANT_PERCENTAGE",
        defaults.split_merchant_percentage,
    )?;
    if split_customer_percentage.checked_add(split_merchant_percentage) != Some(Decimal::hundred())
    {
        return Err(ConfigError::InvalidValue(
            "WALLET_FEE_SPLIT_CUSTOMER_PERCENTAGE".to_string(),
            "customer and merchant split percentages must sum to 100".to_string(),
        ));
    }

    let transfer_fee_tiers = match env_map.get("WALLET_TRANSFER_FEE_TIERS") {
        Some(raw) => parse_transfer_fee_tiers(raw)?,
        None => defaults.transfer_fee_tiers.clone(),
    };

    Ok(FeeSettings {
        currency,
        enable_fees: bool_or(env_map, "WALLET_ENABLE_FEES", defaults.enable_fees)?,
        use_settings_fallback: bool_or(
            env_map,
            "WALLET_USE_SETTINGS_FALLBACK",
            defaults.use_settings_fallback,
        )?,
        default_fee_bearer,
        split_customer_percentage,
        split_merchant_percentage,
        local_card: channel_pricing(env_map, "WALLET_LOCAL_CARD", &defaults.local_card)?,
        intl_card: channel_pricing(env_map, "WALLET_INTL_CARD", &defaults.intl_card)?,
        dva: channel_pricing(env_map, "WALLET_DVA", &defaults.dva)?,
        enable_transfer_fees: bool_or(
            env_map,
            "WALLET_ENABLE_TRANSFER_FEES",
            defaults.enable_transfer_fees,
        )?,
        transfer_fee_tiers,
        enable_internal_transfer_fees: bool_or(
            env_map,
            "WALLET_ENABLE_INTERNAL_TRANSFER_FEES",
            defaults.enable_internal_transfer_fees,
        )?,
        internal_transfer: channel_pricing(
            env_map,
            "WALLET_INTERNAL_TRANSFER",
            &defaults.internal_transfer,
        )?,
        educational: educational_pricing(env_map, &defaults.educational)?,
    })
}

fn educational_pricing(
    env_map: &HashMap<String, String>,
    defaults: &EducationalPricing,
) -> Result<EducationalPricing, ConfigError> {
    Ok(EducationalPricing {
        enabled: bool_or(env_map, "WALLET_ENABLE_EDUCATIONAL_PRICING", defaults.enabled)?,
        card_percentage_fee: decimal_or(
            env_map,
            "WALLET_EDUCATIONAL_CARD_PERCENTAGE_FEE",
            defaults.card_percentage_fee,
        )?,
        card_fee_cap: optional_decimal_or(
            env_map,
            "WALLET_EDUCATIONAL_CARD_FEE_CAP",
            defaults.card_fee_cap,
        )?,
        other_flat_fee: decimal_or(
            env_map,
            "WALLET_EDUCATIONAL_OTHER_FLAT_FEE",
            defaults.other_flat_fee,
        )?,
    })
}

fn channel_pricing(
    env_map: &HashMap<String, String>,
    prefix: &str,
    defaults: &ChannelPricing,
) -> Result<ChannelPricing, ConfigError> {
    Ok(ChannelPricing {
        percentage_fee: decimal_or(
            env_map,
            &format!("{}_PERCENTAGE_FEE", prefix),
            defaults.percentage_fee,
        )?,
        flat_fee: decimal_or(env_map, &format!("{}_FLAT_FEE", prefix), defaults.flat_fee)?,
        fee_cap: optional_decimal_or(env_map, &format!("{}_FEE_CAP", prefix), defaults.fee_cap)?,
        waiver_threshold: optional_decimal_or(
            env_map,
            &format!("{}_FEE_WAIVER_THRESHOLD", prefix),
            defaults.waiver_threshold,
        )?,
    })
}

fn decimal_or(
    env_map: &HashMap<String, String>,
    key: &str,
    default: Decimal,
) -> Result<Decimal, ConfigError> {
    match env_map.get(key) {
        Some(s) => Decimal::from_str_canonical(s).map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), "must be a decimal number".to_string())
        }),
        None => Ok(default),
    }
}

/// An empty value or `none` clears an optional setting.
fn optional_decimal_or(
    env_map: &HashMap<String, String>,
    key: &str,
    default: Option<Decimal>,
) -> Result<Option<Decimal>, ConfigError> {
    match env_map.get(key).map(|s| s.trim()) {
        Some("") | Some("none") => Ok(None),
        Some(s) => Decimal::from_str_canonical(s).map(Some).map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), "must be a decimal number".to_string())
        }),
        None => Ok(default),
    }
}

fn bool_or(
    env_map: &HashMap<String, String>,
    key: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match env_map.get(key).map(|s| s.trim().to_ascii_lowercase()) {
        Some(s) => match s.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::InvalidValue(
                key.to_string(),
                format!("must be true or false, got {}", other),
            )),
        },
        None => Ok(default),
    }
}

/// Parse `max:fee` pairs, e.g. `5000:10,50000:25,*:50`. `*` marks the open top band.
fn parse_transfer_fee_tiers(raw: &str) -> Result<Vec<TransferFeeTier>, ConfigError> {
    let invalid = |msg: &str| {
        ConfigError::InvalidValue("WALLET_TRANSFER_FEE_TIERS".to_string(), msg.to_string())
    };

    let mut tiers = Vec::new();
    for part in raw.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let (max, fee) = part
            .split_once(':')
            .ok_or_else(|| invalid("each tier must be max:fee"))?;
        let max_amount = match max.trim() {
            "*" => None,
            m => Some(
                Decimal::from_str_canonical(m).map_err(|_| invalid("max must be a decimal or *"))?,
            ),
        };
        let fee = Decimal::from_str_canonical(fee).map_err(|_| invalid("fee must be a decimal"))?;
        tiers.push(TransferFeeTier { max_amount, fee });
    }

    if tiers.is_empty() {
        return Err(invalid("at least one tier is required"));
    }
    for pair in tiers.windows(2) {
        match (pair[0].max_amount, pair[1].max_amount) {
            (None, _) => return Err(invalid("* must be the last tier")),
            (Some(a), Some(b)) if b <= a => return Err(invalid("tiers must be ascending")),
            _ => {}
        }
    }
    Ok(tiers)
}
