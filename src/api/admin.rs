use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::api::AppState;
use crate::error::AppError;
use crate::orchestration::{backfill_fee_history, BackfillOptions, BackfillReport};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillRequest {
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub dry_run: bool,
}

pub async fn backfill(
    State(state): State<AppState>,
    body: Option<Json<BackfillRequest>>,
) -> Result<Json<BackfillReport>, AppError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let mut options = BackfillOptions {
        dry_run: body.dry_run,
        ..Default::default()
    };
    if let Some(batch_size) = body.batch_size {
        if batch_size == 0 {
            return Err(AppError::BadRequest("batchSize must be greater than 0".into()));
        }
        options.batch_size = batch_size;
    }

    let report = backfill_fee_history(&state.repo, options).await?;
    Ok(Json(report))
}
