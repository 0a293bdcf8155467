pub mod app_config;
pub mod audit_repo;
pub mod chain_repo;
pub mod database;
pub mod line_item_repo;
pub mod workflow_repo;

pub use audit_repo::StoreAuditRepository;
pub use chain_repo::StoreOrderChainRepository;
pub use database::DbClient;
pub use line_item_repo::StoreLineItemRepository;
pub use workflow_repo::StoreWorkflowRepository;

use trialflow_core::StoreError;

/// Map a sqlx failure onto the repository error type. Unique violations
/// surface as duplicates.
pub(crate) fn store_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::Duplicate(db.message().to_string());
        }
    }
    StoreError::backend(err)
}

/// Error for a column holding a value the model does not know.
pub(crate) fn decode_error(column: &str, value: &str) -> StoreError {
    StoreError::backend(sqlx::Error::Decode(
        format!("unexpected {} value: {}", column, value).into(),
    ))
}
