pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod export;
pub mod orchestration;

pub use config::{Config, FeeSettings};
pub use db::{init_db, Repository};
pub use domain::{
    CalculationMethod, Currency, Decimal, FeeBearer, FeeConfiguration, FeeHistory, FeeTier,
    FeeType, Money, PaymentChannel, TimeMs, Transaction, TransactionType, Wallet,
};
pub use engine::{FeeError, FeeRequest, FeeResolution, FeeResolver};
pub use error::AppError;
pub use orchestration::{FeeService, ServiceError};
