pub mod backfill;
pub mod fee_service;

pub use backfill::{backfill_fee_history, BackfillOptions, BackfillReport};
pub use fee_service::{AppliedFee, FeeService, NewTransaction, ServiceError};
