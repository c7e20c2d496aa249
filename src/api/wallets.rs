use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::api::AppState;
use crate::domain::{Wallet, WalletId};
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletDto {
    pub id: WalletId,
    pub created_at: i64,
}

pub async fn create_wallet(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<WalletDto>), AppError> {
    let wallet = Wallet::new();
    state.repo.insert_wallet(&wallet).await?;
    tracing::info!(wallet_id = %wallet.id, "Created wallet");

    Ok((
        StatusCode::CREATED,
        Json(WalletDto {
            id: wallet.id,
            created_at: wallet.created_at.as_ms(),
        }),
    ))
}
