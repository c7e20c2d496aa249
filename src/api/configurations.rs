use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::api::dto::{
    parse_currency, parse_field, parse_money, parse_optional_field, parse_optional_money,
    parse_tiers, ConfigurationDto, TierInput,
};
use crate::api::AppState;
use crate::db::ConfigurationFilter;
use crate::domain::{ConfigurationId, Currency, Decimal, FeeConfiguration, Money, TimeMs};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConfigurationRequest {
    pub name: String,
    pub description: Option<String>,
    pub wallet_id: Option<String>,
    pub transaction_type: String,
    pub payment_channel: Option<String>,
    pub fee_type: Option<String>,
    pub percentage_fee: Option<String>,
    pub flat_fee: Option<String>,
    pub fee_cap: Option<String>,
    pub minimum_fee: Option<String>,
    pub waiver_threshold: Option<String>,
    pub currency: Option<String>,
    pub fee_bearer: Option<String>,
    pub customer_percentage: Option<String>,
    pub merchant_percentage: Option<String>,
    pub is_active: Option<bool>,
    pub priority: Option<i32>,
    pub valid_from: Option<i64>,
    pub valid_until: Option<i64>,
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub tiers: Vec<TierInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListConfigurationsQuery {
    pub transaction_type: Option<String>,
    pub wallet_id: Option<String>,
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceTiersRequest {
    pub tiers: Vec<TierInput>,
}

fn parse_configuration_id(raw: &str) -> Result<ConfigurationId, AppError> {
    parse_field("configuration id", raw)
}

impl CreateConfigurationRequest {
    fn into_configuration(
        self,
        default_currency: Currency,
    ) -> Result<(FeeConfiguration, Vec<TierInput>), AppError> {
        let currency = parse_currency(self.currency.as_deref(), default_currency)?;
        let transaction_type = parse_field("transactionType", &self.transaction_type)?;
        let mut config = FeeConfiguration::new(self.name, transaction_type);

        config.description = self.description;
        config.wallet_id = parse_optional_field("walletId", self.wallet_id.as_deref())?;
        config.payment_channel =
            parse_optional_field("paymentChannel", self.payment_channel.as_deref())?;
        if let Some(fee_type) = parse_optional_field("feeType", self.fee_type.as_deref())? {
            config.fee_type = fee_type;
        }
        let percentage_fee: Option<Decimal> =
            parse_optional_field("percentageFee", self.percentage_fee.as_deref())?;
        if let Some(pct) = percentage_fee {
            config.percentage_fee = pct;
        }
        config.flat_fee = match self.flat_fee.as_deref() {
            Some(v) => parse_money("flatFee", v, currency)?,
            None => Money::zero(currency),
        };
        config.fee_cap = parse_optional_money("feeCap", self.fee_cap.as_deref(), currency)?;
        config.minimum_fee =
            parse_optional_money("minimumFee", self.minimum_fee.as_deref(), currency)?;
        config.waiver_threshold =
            parse_optional_money("waiverThreshold", self.waiver_threshold.as_deref(), currency)?;
        if let Some(bearer) = parse_optional_field("feeBearer", self.fee_bearer.as_deref())? {
            config.fee_bearer = bearer;
        }
        let split: (Option<Decimal>, Option<Decimal>) = (
            parse_optional_field("customerPercentage", self.customer_percentage.as_deref())?,
            parse_optional_field("merchantPercentage", self.merchant_percentage.as_deref())?,
        );
        if let Some(pct) = split.0 {
            config.customer_percentage = pct;
        }
        if let Some(pct) = split.1 {
            config.merchant_percentage = pct;
        }
        config.is_active = self.is_active.unwrap_or(true);
        config.priority = self.priority.unwrap_or(0);
        config.valid_from = self.valid_from.map(TimeMs::new);
        config.valid_until = self.valid_until.map(TimeMs::new);
        if let Some(metadata) = self.metadata {
            if !metadata.is_object() {
                return Err(AppError::BadRequest("metadata must be a JSON object".into()));
            }
            config.metadata = metadata;
        }

        Ok((config, self.tiers))
    }
}

pub async fn create_configuration(
    State(state): State<AppState>,
    Json(body): Json<CreateConfigurationRequest>,
) -> Result<(StatusCode, Json<ConfigurationDto>), AppError> {
    let (config, tier_inputs) = body.into_configuration(state.config.fees.currency)?;
    let tiers = parse_tiers(tier_inputs, config.id, config.currency())?;

    let rule = state.fees.create_configuration(config, tiers).await?;
    Ok((StatusCode::CREATED, Json(ConfigurationDto::from(&rule))))
}

pub async fn list_configurations(
    Query(params): Query<ListConfigurationsQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ConfigurationDto>>, AppError> {
    let filter = ConfigurationFilter {
        transaction_type: parse_optional_field(
            "transactionType",
            params.transaction_type.as_deref(),
        )?,
        wallet_id: parse_optional_field("walletId", params.wallet_id.as_deref())?,
        active_only: params.active_only,
    };

    let configurations = state.repo.list_configurations(&filter).await?;
    Ok(Json(
        configurations
            .iter()
            .map(ConfigurationDto::from_configuration)
            .collect(),
    ))
}

pub async fn get_configuration(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ConfigurationDto>, AppError> {
    let id = parse_configuration_id(&id)?;
    let rule = state
        .repo
        .get_configuration(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("fee configuration {id}")))?;
    Ok(Json(ConfigurationDto::from(&rule)))
}

pub async fn delete_configuration(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let id = parse_configuration_id(&id)?;
    if !state.repo.delete_configuration(&id).await? {
        return Err(AppError::NotFound(format!("fee configuration {id}")));
    }
    tracing::info!(configuration_id = %id, "Deleted fee configuration");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn replace_tiers(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<ReplaceTiersRequest>,
) -> Result<Json<ConfigurationDto>, AppError> {
    let id = parse_configuration_id(&id)?;
    let existing = state
        .repo
        .get_configuration(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("fee configuration {id}")))?;

    let tiers = parse_tiers(body.tiers, id, existing.configuration.currency())?;
    let rule = state.fees.replace_tiers(&id, tiers).await?;
    Ok(Json(ConfigurationDto::from(&rule)))
}
