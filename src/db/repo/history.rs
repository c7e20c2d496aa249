//! Fee history operations for the repository.
//!
//! History rows are append-only: there is no update path.

use crate::domain::{FeeHistory, TimeMs, TransactionId};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use tracing::warn;

use super::{json_column, money_column, parse_column, parse_optional_column, Repository};

const HISTORY_COLUMNS: &str = "id, transaction_id, configuration_id, calculation_method, \
     original_amount, original_amount_currency, calculated_fee, calculated_fee_currency, \
     fee_bearer, calculation_details, created_at";

/// Optional filters for listing history.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub transaction_id: Option<TransactionId>,
    pub from_ms: Option<TimeMs>,
    pub to_ms: Option<TimeMs>,
    pub limit: Option<u32>,
}

fn history_from_row(row: &SqliteRow) -> Result<FeeHistory, sqlx::Error> {
    Ok(FeeHistory {
        id: parse_column(row, "id")?,
        transaction_id: parse_column(row, "transaction_id")?,
        configuration_id: parse_optional_column(row, "configuration_id")?,
        calculation_method: parse_column(row, "calculation_method")?,
        original_amount: money_column(row, "original_amount", "original_amount_currency"),
        calculated_fee: money_column(row, "calculated_fee", "calculated_fee_currency"),
        fee_bearer: parse_column(row, "fee_bearer")?,
        calculation_details: json_column(row, "calculation_details"),
        created_at: TimeMs::new(row.try_get("created_at")?),
    })
}

pub async fn history_exists_for(
    conn: &mut SqliteConnection,
    transaction_id: &TransactionId,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT 1 FROM fee_history WHERE transaction_id = ?")
        .bind(transaction_id.to_db())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}

/// Append a history row.
///
/// # Errors
/// Fails with a unique violation when the transaction already has history.
pub async fn insert_history(
    conn: &mut SqliteConnection,
    history: &FeeHistory,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO fee_history (
            id, transaction_id, configuration_id, calculation_method,
            original_amount, original_amount_currency, calculated_fee, calculated_fee_currency,
            fee_bearer, calculation_details, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(history.id.to_db())
    .bind(history.transaction_id.to_db())
    .bind(history.configuration_id.map(|c| c.to_db()))
    .bind(history.calculation_method.as_str())
    .bind(history.original_amount.amount.to_canonical_string())
    .bind(history.original_amount.currency.code())
    .bind(history.calculated_fee.amount.to_canonical_string())
    .bind(history.calculated_fee.currency.code())
    .bind(history.fee_bearer.as_str())
    .bind(history.calculation_details.to_string())
    .bind(history.created_at.as_ms())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

impl Repository {
    pub async fn get_history_for_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<FeeHistory>, sqlx::Error> {
        let sql = format!("SELECT {HISTORY_COLUMNS} FROM fee_history WHERE transaction_id = ?");
        let row = sqlx::query(&sql)
            .bind(transaction_id.to_db())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(history_from_row).transpose()
    }

    /// Query history newest first, optionally by transaction and inclusive time range.
    pub async fn query_history(&self, filter: &HistoryFilter) -> Result<Vec<FeeHistory>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {HISTORY_COLUMNS}
            FROM fee_history
            WHERE (? IS NULL OR transaction_id = ?)
              AND (? IS NULL OR created_at >= ?)
              AND (? IS NULL OR created_at <= ?)
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#
        );
        let transaction_id = filter.transaction_id.map(|t| t.to_db());
        let from_ms = filter.from_ms.map(|t| t.as_ms());
        let to_ms = filter.to_ms.map(|t| t.as_ms());
        // SQLite treats a negative LIMIT as unbounded.
        let limit = filter.limit.map_or(-1i64, i64::from);

        let rows = sqlx::query(&sql)
            .bind(transaction_id.clone())
            .bind(transaction_id)
            .bind(from_ms)
            .bind(from_ms)
            .bind(to_ms)
            .bind(to_ms)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(history_from_row).collect()
    }

    /// Insert a batch of history rows in one transaction, skipping rows that fail.
    ///
    /// Returns `(created, errors)`. A failed row does not roll back its batch.
    pub async fn insert_history_batch(
        &self,
        records: &[FeeHistory],
    ) -> Result<(usize, usize), sqlx::Error> {
        if records.is_empty() {
            return Ok((0, 0));
        }

        let mut created = 0usize;
        let mut errors = 0usize;
        let mut tx = self.pool.begin().await?;

        for record in records {
            match insert_history(&mut tx, record).await {
                Ok(()) => created += 1,
                Err(e) => {
                    warn!(
                        transaction_id = %record.transaction_id,
                        error = %e,
                        "Failed to insert fee history row"
                    );
                    errors += 1;
                }
            }
        }

        tx.commit().await?;
        Ok((created, errors))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::setup_test_db;
    use super::super::{insert_configuration, insert_transaction};
    use super::*;
    use crate::domain::{
        CalculationMethod, FeeBearer, FeeConfiguration, HistoryId, Money, Transaction,
        TransactionType, Wallet,
    };

    fn ngn(s: &str) -> Money {
        Money::parse(s, "NGN").unwrap()
    }

    fn record(transaction: &Transaction, created_at: i64) -> FeeHistory {
        FeeHistory {
            id: HistoryId::new_v4(),
            transaction_id: transaction.id,
            configuration_id: None,
            calculation_method: CalculationMethod::Database,
            original_amount: transaction.amount,
            calculated_fee: ngn("7.50"),
            fee_bearer: FeeBearer::Customer,
            calculation_details: serde_json::json!({"rawFee": "7.5"}),
            created_at: TimeMs::new(created_at),
        }
    }

    async fn seed_transactions(repo: &Repository, n: usize) -> Vec<Transaction> {
        let wallet = Wallet::new();
        repo.insert_wallet(&wallet).await.unwrap();
        let mut conn = repo.pool().acquire().await.unwrap();
        let mut out = Vec::new();
        for i in 0..n {
            let tx = Transaction::new(
                wallet.id,
                format!("ref-{i}"),
                TransactionType::Deposit,
                None,
                ngn("500"),
            );
            insert_transaction(&mut conn, &tx).await.unwrap();
            out.push(tx);
        }
        out
    }

    #[tokio::test]
    async fn test_second_history_for_transaction_rejected() {
        let (repo, _temp) = setup_test_db().await;
        let txs = seed_transactions(&repo, 1).await;

        let mut conn = repo.pool().acquire().await.unwrap();
        insert_history(&mut conn, &record(&txs[0], 1)).await.unwrap();
        assert!(history_exists_for(&mut conn, &txs[0].id).await.unwrap());
        assert!(insert_history(&mut conn, &record(&txs[0], 2)).await.is_err());
        drop(conn);

        let stored = repo
            .get_history_for_transaction(&txs[0].id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.created_at, TimeMs::new(1));
        assert_eq!(stored.calculated_fee, ngn("7.50"));
        assert_eq!(stored.calculation_details["rawFee"], "7.5");
    }

    #[tokio::test]
    async fn test_configuration_delete_nulls_history_reference() {
        let (repo, _temp) = setup_test_db().await;
        let txs = seed_transactions(&repo, 1).await;
        let config = FeeConfiguration::new("hybrid", TransactionType::Deposit);

        let mut conn = repo.pool().acquire().await.unwrap();
        insert_configuration(&mut conn, &config).await.unwrap();
        let mut history = record(&txs[0], 1);
        history.configuration_id = Some(config.id);
        insert_history(&mut conn, &history).await.unwrap();
        drop(conn);

        assert!(repo.delete_configuration(&config.id).await.unwrap());
        let stored = repo
            .get_history_for_transaction(&txs[0].id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, history.id);
        assert_eq!(stored.configuration_id, None);
    }

    #[tokio::test]
    async fn test_query_history_time_range_and_limit() {
        let (repo, _temp) = setup_test_db().await;
        let txs = seed_transactions(&repo, 3).await;
        let records: Vec<FeeHistory> = txs
            .iter()
            .enumerate()
            .map(|(i, tx)| record(tx, 1_000 * (i as i64 + 1)))
            .collect();
        assert_eq!(repo.insert_history_batch(&records).await.unwrap(), (3, 0));

        let filter = HistoryFilter {
            from_ms: Some(TimeMs::new(1_500)),
            to_ms: Some(TimeMs::new(3_000)),
            ..Default::default()
        };
        let found = repo.query_history(&filter).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].created_at, TimeMs::new(3_000));

        let limited = HistoryFilter {
            limit: Some(1),
            ..Default::default()
        };
        assert_eq!(repo.query_history(&limited).await.unwrap().len(), 1);

        let by_tx = HistoryFilter {
            transaction_id: Some(txs[0].id),
            ..Default::default()
        };
        let found = repo.query_history(&by_tx).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].transaction_id, txs[0].id);
    }

    #[tokio::test]
    async fn test_batch_counts_errors_without_aborting() {
        let (repo, _temp) = setup_test_db().await;
        let txs = seed_transactions(&repo, 2).await;
        let batch = vec![record(&txs[0], 1), record(&txs[0], 2), record(&txs[1], 3)];

        assert_eq!(repo.insert_history_batch(&batch).await.unwrap(), (2, 1));
        assert_eq!(
            repo.query_history(&HistoryFilter::default()).await.unwrap().len(),
            2
        );
    }
}
