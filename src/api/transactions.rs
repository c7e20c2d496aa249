use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::dto::{
    parse_currency, parse_field, parse_money, parse_optional_field, HistoryDto, ResolutionDto,
    TransactionDto,
};
use crate::api::AppState;
use crate::domain::TransactionId;
use crate::error::AppError;
use crate::orchestration::{AppliedFee, NewTransaction};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordTransactionRequest {
    pub wallet_id: String,
    pub reference: String,
    pub transaction_type: String,
    pub payment_channel: Option<String>,
    pub amount: String,
    pub currency: Option<String>,
    pub fee_bearer: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyFeeRequest {
    pub fee_bearer: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedFeeResponse {
    pub transaction: TransactionDto,
    pub fee: ResolutionDto,
    pub history: HistoryDto,
}

impl From<&AppliedFee> for AppliedFeeResponse {
    fn from(applied: &AppliedFee) -> Self {
        Self {
            transaction: TransactionDto::from(&applied.transaction),
            fee: ResolutionDto::from(&applied.resolution),
            history: HistoryDto::from(&applied.history),
        }
    }
}

pub async fn record_transaction(
    State(state): State<AppState>,
    Json(body): Json<RecordTransactionRequest>,
) -> Result<(StatusCode, Json<AppliedFeeResponse>), AppError> {
    if body.reference.trim().is_empty() {
        return Err(AppError::BadRequest("reference must not be empty".into()));
    }
    let currency = parse_currency(body.currency.as_deref(), state.config.fees.currency)?;

    let new = NewTransaction {
        wallet_id: parse_field("walletId", &body.wallet_id)?,
        reference: body.reference,
        transaction_type: parse_field("transactionType", &body.transaction_type)?,
        payment_channel: parse_optional_field("paymentChannel", body.payment_channel.as_deref())?,
        amount: parse_money("amount", &body.amount, currency)?,
        bearer_override: parse_optional_field("feeBearer", body.fee_bearer.as_deref())?,
    };

    let applied = state.fees.record_transaction(new).await?;
    Ok((StatusCode::CREATED, Json(AppliedFeeResponse::from(&applied))))
}

pub async fn apply_fee(
    Path(id): Path<String>,
    State(state): State<AppState>,
    body: Option<Json<ApplyFeeRequest>>,
) -> Result<(StatusCode, Json<AppliedFeeResponse>), AppError> {
    let id: TransactionId = parse_field("transaction id", &id)?;
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let bearer_override = parse_optional_field("feeBearer", body.fee_bearer.as_deref())?;

    let applied = state.fees.apply_to_existing(&id, bearer_override).await?;
    Ok((StatusCode::CREATED, Json(AppliedFeeResponse::from(&applied))))
}
