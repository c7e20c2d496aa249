//! Wallet and transaction operations for the repository.

use crate::domain::{FeeBearer, Money, TimeMs, Transaction, TransactionId, Wallet, WalletId};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

use super::{money_column, parse_column, parse_optional_column, Repository};

const TRANSACTION_COLUMNS: &str = "id, wallet_id, reference, transaction_type, payment_channel, \
     amount, amount_currency, fees, fees_currency, fee_bearer, created_at";

/// Position of the last row read by a missing-history page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionCursor {
    pub created_at: TimeMs,
    pub id: TransactionId,
}

#[derive(Debug, Clone, Default)]
pub struct MissingHistoryPage {
    /// Rows of the page carrying a non-zero fee.
    pub charged: Vec<Transaction>,
    /// Where the next page starts. `None` once the table is exhausted.
    pub next: Option<TransactionCursor>,
}

fn transaction_from_row(row: &SqliteRow) -> Result<Transaction, sqlx::Error> {
    Ok(Transaction {
        id: parse_column(row, "id")?,
        wallet_id: parse_column(row, "wallet_id")?,
        reference: row.try_get("reference")?,
        transaction_type: parse_column(row, "transaction_type")?,
        payment_channel: parse_optional_column(row, "payment_channel")?,
        amount: money_column(row, "amount", "amount_currency"),
        fees: money_column(row, "fees", "fees_currency"),
        fee_bearer: parse_optional_column(row, "fee_bearer")?,
        created_at: TimeMs::new(row.try_get("created_at")?),
    })
}

pub async fn wallet_exists(
    conn: &mut SqliteConnection,
    wallet_id: &WalletId,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT 1 FROM wallets WHERE id = ?")
        .bind(wallet_id.to_db())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}

pub async fn reference_exists(
    conn: &mut SqliteConnection,
    reference: &str,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT 1 FROM transactions WHERE reference = ?")
        .bind(reference)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}

/// Insert a transaction row as-is.
///
/// # Errors
/// Fails on a duplicate reference or an unknown wallet.
pub async fn insert_transaction(
    conn: &mut SqliteConnection,
    transaction: &Transaction,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, wallet_id, reference, transaction_type, payment_channel,
            amount, amount_currency, fees, fees_currency, fee_bearer, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(transaction.id.to_db())
    .bind(transaction.wallet_id.to_db())
    .bind(&transaction.reference)
    .bind(transaction.transaction_type.as_str())
    .bind(transaction.payment_channel.map(|c| c.as_str()))
    .bind(transaction.amount.amount.to_canonical_string())
    .bind(transaction.amount.currency.code())
    .bind(transaction.fees.amount.to_canonical_string())
    .bind(transaction.fees.currency.code())
    .bind(transaction.fee_bearer.map(|b| b.as_str()))
    .bind(transaction.created_at.as_ms())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn fetch_transaction(
    conn: &mut SqliteConnection,
    id: &TransactionId,
) -> Result<Option<Transaction>, sqlx::Error> {
    let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id.to_db())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(transaction_from_row).transpose()
}

/// Write the resolved fee onto a transaction. Returns the number of rows touched.
pub async fn update_transaction_fee(
    conn: &mut SqliteConnection,
    id: &TransactionId,
    fees: &Money,
    bearer: FeeBearer,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE transactions
        SET fees = ?, fees_currency = ?, fee_bearer = ?
        WHERE id = ?
        "#,
    )
    .bind(fees.amount.to_canonical_string())
    .bind(fees.currency.code())
    .bind(bearer.as_str())
    .bind(id.to_db())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

impl Repository {
    // =========================================================================
    // Wallet operations
    // =========================================================================

    /// Insert a wallet.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_wallet(&self, wallet: &Wallet) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO wallets (id, created_at) VALUES (?, ?)")
            .bind(wallet.id.to_db())
            .bind(wallet.created_at.as_ms())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_wallet(&self, id: &WalletId) -> Result<Option<Wallet>, sqlx::Error> {
        let row = sqlx::query("SELECT id, created_at FROM wallets WHERE id = ?")
            .bind(id.to_db())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| {
            Ok(Wallet {
                id: parse_column(&r, "id")?,
                created_at: TimeMs::new(r.try_get("created_at")?),
            })
        })
        .transpose()
    }

    // =========================================================================
    // Transaction operations
    // =========================================================================

    pub async fn get_transaction(
        &self,
        id: &TransactionId,
    ) -> Result<Option<Transaction>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        fetch_transaction(&mut conn, id).await
    }

    /// One keyset page of transactions without a history row, oldest first.
    ///
    /// `limit` bounds the rows read, so `charged` may hold fewer entries once
    /// zero-fee rows are dropped. The non-zero filter runs on parsed decimals
    /// since stored amounts are text.
    pub async fn transactions_missing_history(
        &self,
        after: Option<TransactionCursor>,
        limit: usize,
    ) -> Result<MissingHistoryPage, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM transactions t
            WHERE NOT EXISTS (SELECT 1 FROM fee_history h WHERE h.transaction_id = t.id)
              AND (created_at > ? OR (created_at = ? AND id > ?))
            ORDER BY created_at ASC, id ASC
            LIMIT ?
            "#
        );
        let (after_ms, after_id) = match after {
            Some(cursor) => (cursor.created_at.as_ms(), cursor.id.to_db()),
            None => (i64::MIN, String::new()),
        };
        let limit = limit.max(1);
        let rows = sqlx::query(&sql)
            .bind(after_ms)
            .bind(after_ms)
            .bind(after_id)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        let mut page = MissingHistoryPage::default();
        let mut last = None;
        for row in &rows {
            let transaction = transaction_from_row(row)?;
            last = Some(TransactionCursor {
                created_at: transaction.created_at,
                id: transaction.id,
            });
            if !transaction.fees.is_zero() && !transaction.fees.is_negative() {
                page.charged.push(transaction);
            }
        }
        if rows.len() == limit {
            page.next = last;
        }
        Ok(page)
    }
}
