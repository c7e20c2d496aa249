use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::api::dto::{parse_optional_field, HistoryDto};
use crate::api::AppState;
use crate::db::HistoryFilter;
use crate::domain::TimeMs;
use crate::error::AppError;
use crate::export::history_csv_string;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub transaction_id: Option<String>,
    pub from_ms: Option<i64>,
    pub to_ms: Option<i64>,
    pub limit: Option<u32>,
}

impl HistoryQuery {
    fn into_filter(self) -> Result<HistoryFilter, AppError> {
        let from_ms = self.from_ms.map(TimeMs::new);
        let to_ms = self.to_ms.map(TimeMs::new);
        if let (Some(from_ms), Some(to_ms)) = (from_ms, to_ms) {
            if from_ms > to_ms {
                return Err(AppError::BadRequest("fromMs must be <= toMs".into()));
            }
        }

        Ok(HistoryFilter {
            transaction_id: parse_optional_field("transactionId", self.transaction_id.as_deref())?,
            from_ms,
            to_ms,
            limit: self.limit,
        })
    }
}

pub async fn list_history(
    Query(params): Query<HistoryQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<HistoryDto>>, AppError> {
    let filter = params.into_filter()?;
    let records = state.repo.query_history(&filter).await?;
    Ok(Json(records.iter().map(HistoryDto::from).collect()))
}

pub async fn export_history(
    Query(params): Query<HistoryQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let filter = params.into_filter()?;
    let records = state.repo.query_history(&filter).await?;
    let body = history_csv_string(&records)
        .map_err(|e| AppError::Internal(format!("CSV export failed: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"fee_history.csv\"",
            ),
        ],
        body,
    ))
}
