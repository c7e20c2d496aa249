use crate::config::FeeSettings;
use crate::db::repo::{
    fetch_transaction, history_exists_for, insert_history, insert_transaction, load_candidates,
    reference_exists, update_transaction_fee, wallet_exists,
};
use crate::db::Repository;
use crate::domain::{
    validate_tiers, ConfigurationId, FeeBearer, FeeConfiguration, FeeHistory, FeeTier, Money,
    PaymentChannel, TimeMs, Transaction, TransactionId, TransactionType, ValidationError,
    WalletId,
};
use crate::engine::{ConfiguredRule, FeeError, FeeRequest, FeeResolution, FeeResolver};
use sqlx::sqlite::SqliteConnection;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Fee(#[from] FeeError),
    #[error("{0} not found")]
    NotFound(String),
    #[error("fee already recorded for transaction {0}")]
    AlreadyRecorded(TransactionId),
    #[error("transaction reference already exists: {0}")]
    DuplicateReference(String),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// A transaction to record together with its fee.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub wallet_id: WalletId,
    pub reference: String,
    pub transaction_type: TransactionType,
    pub payment_channel: Option<PaymentChannel>,
    pub amount: Money,
    pub bearer_override: Option<FeeBearer>,
}

/// The committed outcome of applying a fee.
#[derive(Debug, Clone)]
pub struct AppliedFee {
    pub transaction: Transaction,
    pub resolution: FeeResolution,
    pub history: FeeHistory,
}

/// Runs fee resolution against stored configurations and persists the result.
#[derive(Clone)]
pub struct FeeService {
    repo: Arc<Repository>,
    resolver: Arc<FeeResolver>,
}

impl FeeService {
    pub fn new(repo: Arc<Repository>, settings: FeeSettings) -> Self {
        Self {
            repo,
            resolver: Arc::new(FeeResolver::new(settings)),
        }
    }

    pub fn repo(&self) -> &Arc<Repository> {
        &self.repo
    }

    pub fn resolver(&self) -> &FeeResolver {
        &self.resolver
    }

    /// Validate and store a configuration with its tiers.
    pub async fn create_configuration(
        &self,
        configuration: FeeConfiguration,
        mut tiers: Vec<FeeTier>,
    ) -> Result<ConfiguredRule, ServiceError> {
        configuration.validate()?;
        for tier in &mut tiers {
            tier.configuration_id = configuration.id;
        }
        validate_tiers(&tiers, configuration.currency())?;

        if let Some(wallet_id) = &configuration.wallet_id {
            let mut conn = self.repo.pool().acquire().await?;
            if !wallet_exists(&mut conn, wallet_id).await? {
                return Err(ServiceError::NotFound(format!("wallet {wallet_id}")));
            }
        }

        self.repo.create_configuration(&configuration, &tiers).await?;
        info!(
            configuration_id = %configuration.id,
            transaction_type = %configuration.transaction_type,
            tiers = tiers.len(),
            "Created fee configuration"
        );
        Ok(ConfiguredRule::new(configuration, tiers))
    }

    /// Replace a configuration's tier set after validating it as a whole.
    pub async fn replace_tiers(
        &self,
        id: &ConfigurationId,
        mut tiers: Vec<FeeTier>,
    ) -> Result<ConfiguredRule, ServiceError> {
        let rule = self
            .repo
            .get_configuration(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("fee configuration {id}")))?;

        for tier in &mut tiers {
            tier.configuration_id = *id;
        }
        validate_tiers(&tiers, rule.configuration.currency())?;

        if !self.repo.replace_tiers(id, &tiers).await? {
            return Err(ServiceError::NotFound(format!("fee configuration {id}")));
        }
        Ok(ConfiguredRule::new(rule.configuration, tiers))
    }

    /// Price a request without writing anything.
    pub async fn quote(&self, request: &FeeRequest) -> Result<FeeResolution, ServiceError> {
        let candidates = self
            .repo
            .load_candidates(request.transaction_type, request.wallet_id)
            .await?;
        Ok(self.resolver.resolve(&candidates, request)?)
    }

    /// Insert a transaction and apply its fee in one database transaction.
    pub async fn record_transaction(
        &self,
        new: NewTransaction,
    ) -> Result<AppliedFee, ServiceError> {
        let mut tx = self.repo.begin().await?;

        if !wallet_exists(&mut tx, &new.wallet_id).await? {
            return Err(ServiceError::NotFound(format!("wallet {}", new.wallet_id)));
        }
        if reference_exists(&mut tx, &new.reference).await? {
            return Err(ServiceError::DuplicateReference(new.reference));
        }

        let transaction = Transaction::new(
            new.wallet_id,
            new.reference,
            new.transaction_type,
            new.payment_channel,
            new.amount,
        );
        insert_transaction(&mut tx, &transaction).await?;

        let applied = self
            .apply_within(&mut tx, transaction, new.bearer_override)
            .await?;
        tx.commit().await?;

        log_applied(&applied, "Recorded transaction with fee");
        Ok(applied)
    }

    /// Apply the fee to a stored transaction that has no history yet.
    pub async fn apply_to_existing(
        &self,
        id: &TransactionId,
        bearer_override: Option<FeeBearer>,
    ) -> Result<AppliedFee, ServiceError> {
        let mut tx = self.repo.begin().await?;

        let transaction = fetch_transaction(&mut tx, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("transaction {id}")))?;
        if history_exists_for(&mut tx, id).await? {
            return Err(ServiceError::AlreadyRecorded(*id));
        }

        let applied = self.apply_within(&mut tx, transaction, bearer_override).await?;
        tx.commit().await?;

        log_applied(&applied, "Applied fee to existing transaction");
        Ok(applied)
    }

    /// Select, calculate, split, then write fee and history on `conn`.
    /// Nothing is committed here; any error leaves the caller's transaction to roll back.
    async fn apply_within(
        &self,
        conn: &mut SqliteConnection,
        mut transaction: Transaction,
        bearer_override: Option<FeeBearer>,
    ) -> Result<AppliedFee, ServiceError> {
        let request = FeeRequest {
            transaction_type: transaction.transaction_type,
            payment_channel: transaction.payment_channel,
            wallet_id: Some(transaction.wallet_id),
            amount: transaction.amount,
            at: transaction.created_at,
            bearer_override,
        };

        let candidates = load_candidates(conn, request.transaction_type, request.wallet_id).await?;
        let resolution = self.resolver.resolve(&candidates, &request)?;

        update_transaction_fee(conn, &transaction.id, &resolution.fee(), resolution.bearer())
            .await?;
        transaction.fees = resolution.fee();
        transaction.fee_bearer = Some(resolution.bearer());

        let history = resolution.to_history(transaction.id, TimeMs::now());
        insert_history(conn, &history).await.map_err(|e| {
            if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
                ServiceError::AlreadyRecorded(transaction.id)
            } else {
                ServiceError::Db(e)
            }
        })?;

        Ok(AppliedFee {
            transaction,
            resolution,
            history,
        })
    }
}

fn log_applied(applied: &AppliedFee, message: &str) {
    info!(
        transaction_id = %applied.transaction.id,
        configuration_id = ?applied.resolution.configuration_id,
        method = %applied.resolution.method,
        fee = %applied.resolution.fee(),
        bearer = %applied.resolution.bearer(),
        "{}",
        message
    );
}
