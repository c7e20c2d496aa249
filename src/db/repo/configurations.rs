//! Fee configuration and tier operations for the repository.

use crate::domain::{
    ConfigurationId, FeeConfiguration, FeeTier, TimeMs, TransactionType, WalletId,
};
use crate::engine::ConfiguredRule;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

use super::{
    decimal_column, json_column, money_column, optional_money_column, parse_column,
    parse_optional_column, Repository,
};

const CONFIGURATION_COLUMNS: &str = "id, name, description, wallet_id, transaction_type, \
     payment_channel, fee_type, percentage_fee, flat_fee, flat_fee_currency, fee_cap, \
     fee_cap_currency, minimum_fee, minimum_fee_currency, waiver_threshold, \
     waiver_threshold_currency, fee_bearer, customer_percentage, merchant_percentage, \
     is_active, priority, valid_from, valid_until, metadata, created_at, updated_at";

const TIER_COLUMNS: &str = "id, configuration_id, min_amount, min_amount_currency, max_amount, \
     max_amount_currency, fee_amount, fee_amount_currency, created_at";

/// Optional filters for listing configurations.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationFilter {
    pub transaction_type: Option<TransactionType>,
    pub wallet_id: Option<WalletId>,
    pub active_only: bool,
}

fn configuration_from_row(row: &SqliteRow) -> Result<FeeConfiguration, sqlx::Error> {
    Ok(FeeConfiguration {
        id: parse_column(row, "id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        wallet_id: parse_optional_column(row, "wallet_id")?,
        transaction_type: parse_column(row, "transaction_type")?,
        payment_channel: parse_optional_column(row, "payment_channel")?,
        fee_type: parse_column(row, "fee_type")?,
        percentage_fee: decimal_column(row, "percentage_fee"),
        flat_fee: money_column(row, "flat_fee", "flat_fee_currency"),
        fee_cap: optional_money_column(row, "fee_cap", "fee_cap_currency"),
        minimum_fee: optional_money_column(row, "minimum_fee", "minimum_fee_currency"),
        waiver_threshold: optional_money_column(row, "waiver_threshold", "waiver_threshold_currency"),
        fee_bearer: parse_column(row, "fee_bearer")?,
        customer_percentage: decimal_column(row, "customer_percentage"),
        merchant_percentage: decimal_column(row, "merchant_percentage"),
        is_active: row.try_get("is_active")?,
        priority: row.try_get("priority")?,
        valid_from: row.try_get::<Option<i64>, _>("valid_from")?.map(TimeMs::new),
        valid_until: row.try_get::<Option<i64>, _>("valid_until")?.map(TimeMs::new),
        metadata: json_column(row, "metadata"),
        created_at: TimeMs::new(row.try_get("created_at")?),
        updated_at: TimeMs::new(row.try_get("updated_at")?),
    })
}

fn tier_from_row(row: &SqliteRow) -> Result<FeeTier, sqlx::Error> {
    Ok(FeeTier {
        id: parse_column(row, "id")?,
        configuration_id: parse_column(row, "configuration_id")?,
        min_amount: money_column(row, "min_amount", "min_amount_currency"),
        max_amount: optional_money_column(row, "max_amount", "max_amount_currency"),
        fee_amount: money_column(row, "fee_amount", "fee_amount_currency"),
        created_at: TimeMs::new(row.try_get("created_at")?),
    })
}

/// Insert a configuration row. Callers validate before writing.
pub async fn insert_configuration(
    conn: &mut SqliteConnection,
    config: &FeeConfiguration,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO fee_configurations (
            id, name, description, wallet_id, transaction_type, payment_channel,
            fee_type, percentage_fee, flat_fee, flat_fee_currency,
            fee_cap, fee_cap_currency, minimum_fee, minimum_fee_currency,
            waiver_threshold, waiver_threshold_currency, fee_bearer,
            customer_percentage, merchant_percentage, is_active, priority,
            valid_from, valid_until, metadata, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(config.id.to_db())
    .bind(&config.name)
    .bind(config.description.as_deref())
    .bind(config.wallet_id.map(|w| w.to_db()))
    .bind(config.transaction_type.as_str())
    .bind(config.payment_channel.map(|c| c.as_str()))
    .bind(config.fee_type.as_str())
    .bind(config.percentage_fee.to_canonical_string())
    .bind(config.flat_fee.amount.to_canonical_string())
    .bind(config.flat_fee.currency.code())
    .bind(config.fee_cap.map(|m| m.amount.to_canonical_string()))
    .bind(config.fee_cap.map(|m| m.currency.code()))
    .bind(config.minimum_fee.map(|m| m.amount.to_canonical_string()))
    .bind(config.minimum_fee.map(|m| m.currency.code()))
    .bind(config.waiver_threshold.map(|m| m.amount.to_canonical_string()))
    .bind(config.waiver_threshold.map(|m| m.currency.code()))
    .bind(config.fee_bearer.as_str())
    .bind(config.customer_percentage.to_canonical_string())
    .bind(config.merchant_percentage.to_canonical_string())
    .bind(config.is_active)
    .bind(config.priority)
    .bind(config.valid_from.map(|t| t.as_ms()))
    .bind(config.valid_until.map(|t| t.as_ms()))
    .bind(config.metadata.to_string())
    .bind(config.created_at.as_ms())
    .bind(config.updated_at.as_ms())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn insert_tiers(conn: &mut SqliteConnection, tiers: &[FeeTier]) -> Result<(), sqlx::Error> {
    for tier in tiers {
        sqlx::query(
            r#"
            INSERT INTO fee_tiers (
                id, configuration_id, min_amount, min_amount_currency,
                max_amount, max_amount_currency, fee_amount, fee_amount_currency, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(tier.id.to_db())
        .bind(tier.configuration_id.to_db())
        .bind(tier.min_amount.amount.to_canonical_string())
        .bind(tier.min_amount.currency.code())
        .bind(tier.max_amount.map(|m| m.amount.to_canonical_string()))
        .bind(tier.max_amount.map(|m| m.currency.code()))
        .bind(tier.fee_amount.amount.to_canonical_string())
        .bind(tier.fee_amount.currency.code())
        .bind(tier.created_at.as_ms())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn delete_tiers(
    conn: &mut SqliteConnection,
    configuration_id: &ConfigurationId,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM fee_tiers WHERE configuration_id = ?")
        .bind(configuration_id.to_db())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

async fn fetch_tiers(
    conn: &mut SqliteConnection,
    configuration_id: &ConfigurationId,
) -> Result<Vec<FeeTier>, sqlx::Error> {
    let sql = format!(
        "SELECT {TIER_COLUMNS} FROM fee_tiers WHERE configuration_id = ? ORDER BY created_at ASC, id ASC"
    );
    let rows = sqlx::query(&sql)
        .bind(configuration_id.to_db())
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(tier_from_row).collect()
}

async fn fetch_configuration(
    conn: &mut SqliteConnection,
    id: &ConfigurationId,
) -> Result<Option<FeeConfiguration>, sqlx::Error> {
    let sql = format!("SELECT {CONFIGURATION_COLUMNS} FROM fee_configurations WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id.to_db())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(configuration_from_row).transpose()
}

/// Active configurations of `transaction_type` that are global or belong to `wallet_id`,
/// each with its tiers. Channel and validity window are left to the matcher.
pub async fn load_candidates(
    conn: &mut SqliteConnection,
    transaction_type: TransactionType,
    wallet_id: Option<WalletId>,
) -> Result<Vec<ConfiguredRule>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {CONFIGURATION_COLUMNS}
        FROM fee_configurations
        WHERE transaction_type = ? AND is_active = 1
          AND (wallet_id IS NULL OR wallet_id = ?)
        "#
    );
    let rows = sqlx::query(&sql)
        .bind(transaction_type.as_str())
        .bind(wallet_id.map(|w| w.to_db()))
        .fetch_all(&mut *conn)
        .await?;

    let mut rules = Vec::with_capacity(rows.len());
    for row in &rows {
        let configuration = configuration_from_row(row)?;
        let tiers = fetch_tiers(conn, &configuration.id).await?;
        rules.push(ConfiguredRule::new(configuration, tiers));
    }
    Ok(rules)
}

impl Repository {
    /// Insert a configuration and its tiers atomically.
    ///
    /// # Errors
    /// Returns an error if any insert fails; nothing is committed in that case.
    pub async fn create_configuration(
        &self,
        config: &FeeConfiguration,
        tiers: &[FeeTier],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        insert_configuration(&mut tx, config).await?;
        insert_tiers(&mut tx, tiers).await?;
        tx.commit().await?;
        Ok(())
    }

    /// A configuration with its tiers sorted ascending by `min_amount`.
    pub async fn get_configuration(
        &self,
        id: &ConfigurationId,
    ) -> Result<Option<ConfiguredRule>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        let Some(configuration) = fetch_configuration(&mut conn, id).await? else {
            return Ok(None);
        };
        let tiers = fetch_tiers(&mut conn, id).await?;
        Ok(Some(ConfiguredRule::new(configuration, tiers)))
    }

    /// List configurations, highest priority first.
    pub async fn list_configurations(
        &self,
        filter: &ConfigurationFilter,
    ) -> Result<Vec<FeeConfiguration>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {CONFIGURATION_COLUMNS}
            FROM fee_configurations
            WHERE (? IS NULL OR transaction_type = ?)
              AND (? IS NULL OR wallet_id = ?)
              AND (? = 0 OR is_active = 1)
            ORDER BY priority DESC, created_at DESC, id DESC
            "#
        );
        let transaction_type = filter.transaction_type.map(|t| t.as_str());
        let wallet_id = filter.wallet_id.map(|w| w.to_db());
        let rows = sqlx::query(&sql)
            .bind(transaction_type)
            .bind(transaction_type)
            .bind(wallet_id.clone())
            .bind(wallet_id)
            .bind(filter.active_only)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(configuration_from_row).collect()
    }

    /// Delete a configuration. Tiers cascade; history rows keep a null reference.
    pub async fn delete_configuration(&self, id: &ConfigurationId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM fee_configurations WHERE id = ?")
            .bind(id.to_db())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Swap a configuration's whole tier set. Returns `false` when the configuration does not exist.
    pub async fn replace_tiers(
        &self,
        id: &ConfigurationId,
        tiers: &[FeeTier],
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query("UPDATE fee_configurations SET updated_at = ? WHERE id = ?")
            .bind(TimeMs::now().as_ms())
            .bind(id.to_db())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if touched == 0 {
            return Ok(false);
        }

        delete_tiers(&mut tx, id).await?;
        insert_tiers(&mut tx, tiers).await?;
        tx.commit().await?;
        Ok(true)
    }

    pub async fn load_candidates(
        &self,
        transaction_type: TransactionType,
        wallet_id: Option<WalletId>,
    ) -> Result<Vec<ConfiguredRule>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        load_candidates(&mut conn, transaction_type, wallet_id).await
    }
}
