//! Create history rows for transactions that were charged before history existed.

use crate::db::Repository;
use crate::domain::{
    CalculationMethod, FeeBearer, FeeHistory, HistoryId, TimeMs, Transaction,
};
use serde::Serialize;
use serde_json::json;
use tracing::info;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillOptions {
    pub batch_size: usize,
    /// Count candidates only.
    pub dry_run: bool,
}

impl Default for BackfillOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillReport {
    pub found: usize,
    pub created: usize,
    pub errors: usize,
    pub batches: usize,
    pub dry_run: bool,
}

/// The history row a backfill writes for `transaction`: its stored fee, taken as-is.
pub fn backfill_record(transaction: &Transaction, at: TimeMs) -> FeeHistory {
    FeeHistory {
        id: HistoryId::new_v4(),
        transaction_id: transaction.id,
        configuration_id: None,
        calculation_method: CalculationMethod::Backfill,
        original_amount: transaction.amount,
        calculated_fee: transaction.fees,
        fee_bearer: transaction.fee_bearer.unwrap_or(FeeBearer::Platform),
        calculation_details: json!({
            "backfilled": true,
            "backfill_date": at.to_rfc3339(),
            "transaction_type": transaction.transaction_type,
            "original_bearer": transaction.fee_bearer,
        }),
        created_at: at,
    }
}

/// Backfill history for every charged transaction without one.
///
/// Candidates are read in keyset pages of `batch_size` rows and written one
/// database transaction per batch, so memory stays bounded by the batch size.
pub async fn backfill_fee_history(
    repo: &Repository,
    options: BackfillOptions,
) -> Result<BackfillReport, sqlx::Error> {
    let batch_size = options.batch_size.max(1);
    let mut report = BackfillReport {
        dry_run: options.dry_run,
        ..Default::default()
    };
    info!(batch_size, dry_run = options.dry_run, "Fee history backfill started");

    let mut pending: Vec<Transaction> = Vec::with_capacity(batch_size);
    let mut cursor = None;
    loop {
        let page = repo.transactions_missing_history(cursor, batch_size).await?;
        report.found += page.charged.len();

        if !options.dry_run {
            pending.extend(page.charged);
            while pending.len() >= batch_size {
                let batch: Vec<Transaction> = pending.drain(..batch_size).collect();
                write_batch(repo, &batch, &mut report).await?;
            }
        }

        match page.next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    if !pending.is_empty() {
        write_batch(repo, &pending, &mut report).await?;
    }

    info!(
        found = report.found,
        created = report.created,
        errors = report.errors,
        "Fee history backfill complete"
    );
    Ok(report)
}

async fn write_batch(
    repo: &Repository,
    batch: &[Transaction],
    report: &mut BackfillReport,
) -> Result<(), sqlx::Error> {
    let now = TimeMs::now();
    let records: Vec<FeeHistory> = batch.iter().map(|t| backfill_record(t, now)).collect();
    let (created, errors) = repo.insert_history_batch(&records).await?;

    report.created += created;
    report.errors += errors;
    report.batches += 1;
    info!(
        processed = report.created + report.errors,
        found = report.found,
        "Fee history backfill progress"
    );
    Ok(())
}
