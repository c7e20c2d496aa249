use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::api::dto::{
    parse_currency, parse_field, parse_money, parse_optional_field, ResolutionDto,
};
use crate::api::AppState;
use crate::domain::TimeMs;
use crate::engine::FeeRequest;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub transaction_type: String,
    pub payment_channel: Option<String>,
    pub wallet_id: Option<String>,
    pub amount: String,
    pub currency: Option<String>,
    /// Overrides the bearer the matched rule would assign.
    pub fee_bearer: Option<String>,
    /// Evaluate validity windows at this instant instead of now.
    pub at_ms: Option<i64>,
}

pub async fn quote(
    State(state): State<AppState>,
    Json(body): Json<QuoteRequest>,
) -> Result<Json<ResolutionDto>, AppError> {
    let currency = parse_currency(body.currency.as_deref(), state.config.fees.currency)?;
    let mut request = FeeRequest::new(
        parse_field("transactionType", &body.transaction_type)?,
        parse_money("amount", &body.amount, currency)?,
    );
    request.payment_channel =
        parse_optional_field("paymentChannel", body.payment_channel.as_deref())?;
    request.wallet_id = parse_optional_field("walletId", body.wallet_id.as_deref())?;
    request.bearer_override = parse_optional_field("feeBearer", body.fee_bearer.as_deref())?;
    if let Some(at_ms) = body.at_ms {
        request.at = TimeMs::new(at_ms);
    }

    let resolution = state.fees.quote(&request).await?;
    Ok(Json(ResolutionDto::from(&resolution)))
}
