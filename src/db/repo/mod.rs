//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `transactions.rs` - Wallet and transaction rows
//! - `configurations.rs` - Fee configurations and their tiers
//! - `history.rs` - Fee history records and backfill queries
//!
//! Operations that must share a database transaction with other writes are
//! also exposed as free functions over a `SqliteConnection`.

mod configurations;
mod history;
mod transactions;

pub use configurations::{
    delete_tiers, insert_configuration, insert_tiers, load_candidates, ConfigurationFilter,
};
pub use history::{history_exists_for, insert_history, HistoryFilter};
pub use transactions::{
    fetch_transaction, insert_transaction, reference_exists, update_transaction_fee,
    wallet_exists, MissingHistoryPage, TransactionCursor,
};

use crate::domain::{Currency, Decimal, Money};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{Row, Sqlite, Transaction as DbTransaction};
use std::str::FromStr;
use tracing::warn;

/// Repository for database operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a database transaction for multi-step writes.
    pub async fn begin(&self) -> Result<DbTransaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }

    /// Liveness check used by the readiness endpoint.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// =========================================================================
// Row decoding helpers
// =========================================================================

/// Read a stored decimal string, logging and defaulting on corruption.
pub(crate) fn decimal_column(row: &SqliteRow, column: &str) -> Decimal {
    let raw: String = row.get(column);
    Decimal::from_str(&raw).unwrap_or_else(|e| {
        warn!(column, value = %raw, error = %e, "Failed to parse stored decimal, using default");
        Decimal::default()
    })
}

pub(crate) fn optional_decimal_column(row: &SqliteRow, column: &str) -> Option<Decimal> {
    let raw: Option<String> = row.get(column);
    raw.map(|raw| {
        Decimal::from_str(&raw).unwrap_or_else(|e| {
            warn!(column, value = %raw, error = %e, "Failed to parse stored decimal, using default");
            Decimal::default()
        })
    })
}

fn currency_value(column: &str, raw: &str) -> Currency {
    Currency::from_str(raw).unwrap_or_else(|e| {
        warn!(column, value = %raw, error = %e, "Failed to parse stored currency, using default");
        Currency::default()
    })
}

/// Read an `(amount, currency)` column pair.
pub(crate) fn money_column(row: &SqliteRow, amount: &str, currency: &str) -> Money {
    let code: String = row.get(currency);
    Money {
        amount: decimal_column(row, amount),
        currency: currency_value(currency, &code),
    }
}

/// Read a nullable `(amount, currency)` pair; a missing currency falls back to the default.
pub(crate) fn optional_money_column(row: &SqliteRow, amount: &str, currency: &str) -> Option<Money> {
    let code: Option<String> = row.get(currency);
    optional_decimal_column(row, amount).map(|value| Money {
        amount: value,
        currency: code
            .as_deref()
            .map(|c| currency_value(currency, c))
            .unwrap_or_default(),
    })
}

/// Parse a text column into a typed value; corrupt enum or id values are decode errors.
pub(crate) fn parse_column<T>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.try_get(column)?;
    T::from_str(&raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

pub(crate) fn parse_optional_column<T>(row: &SqliteRow, column: &str) -> Result<Option<T>, sqlx::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|raw| {
        T::from_str(&raw).map_err(|e| sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: Box::new(e),
        })
    })
    .transpose()
}

/// Read a JSON text column, falling back to an empty object.
pub(crate) fn json_column(row: &SqliteRow, column: &str) -> serde_json::Value {
    let raw: String = row.get(column);
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(column, error = %e, "Failed to parse stored JSON, using empty object");
        serde_json::Value::Object(Default::default())
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::setup_test_db;
    use super::*;

    #[tokio::test]
    async fn test_ping() {
        let (repo, _temp) = setup_test_db().await;
        repo.ping().await.expect("ping failed");
    }

    #[tokio::test]
    async fn test_corrupt_decimal_defaults_with_warning() {
        let (repo, _temp) = setup_test_db().await;
        let row = sqlx::query("SELECT 'not-a-number' AS amount, 'NGN' AS amount_currency")
            .fetch_one(repo.pool())
            .await
            .unwrap();
        let money = money_column(&row, "amount", "amount_currency");
        assert_eq!(money, Money::zero(Currency::Ngn));
    }

    #[tokio::test]
    async fn test_corrupt_choice_is_decode_error() {
        let (repo, _temp) = setup_test_db().await;
        let row = sqlx::query("SELECT 'teleport' AS transaction_type")
            .fetch_one(repo.pool())
            .await
            .unwrap();
        let parsed = parse_column::<crate::domain::TransactionType>(&row, "transaction_type");
        assert!(matches!(parsed, Err(sqlx::Error::ColumnDecode { .. })));
    }
}
