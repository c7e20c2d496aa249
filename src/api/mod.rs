pub mod admin;
pub mod configurations;
pub mod dto;
pub mod fees;
pub mod health;
pub mod history;
pub mod transactions;
pub mod wallets;

use crate::config::Config;
use crate::db::Repository;
use crate::orchestration::FeeService;
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub fees: FeeService,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, config: Config) -> Self {
        let fees = FeeService::new(repo.clone(), config.fees.clone());
        Self { repo, config, fees }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/wallets", post(wallets::create_wallet))
        .route(
            "/v1/fee-configurations",
            post(configurations::create_configuration).get(configurations::list_configurations),
        )
        .route(
            "/v1/fee-configurations/:id",
            get(configurations::get_configuration).delete(configurations::delete_configuration),
        )
        .route(
            "/v1/fee-configurations/:id/tiers",
            put(configurations::replace_tiers),
        )
        .route("/v1/fees/quote", post(fees::quote))
        .route("/v1/transactions", post(transactions::record_transaction))
        .route("/v1/transactions/:id/fee", post(transactions::apply_fee))
        .route("/v1/fee-history", get(history::list_history))
        .route("/v1/fee-history/export", get(history::export_history))
        .route("/v1/admin/fee-history/backfill", post(admin::backfill))
        .layer(cors)
        .with_state(state)
}
