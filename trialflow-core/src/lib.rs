pub mod actor;
pub mod repository;

pub use actor::ActorContext;
pub use repository::{
    AuditRepository, LineItemRepository, OrderChainRepository, Repositories, StoreError,
    StoreResult, WorkflowRepository,
};

use trialflow_shared::{AuditEntity, OfferId, WorkflowId};

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The offer was expected to carry a workflow but has no usable relation.
    #[error("Offer {offer_id} has no attached workflow (requested: {workflow_id:?})")]
    BadWorkflowRelation {
        offer_id: OfferId,
        workflow_id: Option<WorkflowId>,
    },

    #[error("Workflow unit not found: {0}")]
    WorkflowUnitNotFound(String),

    #[error("Failed to create audit record for {entity} {entity_id} field {field}: {source}")]
    AuditCreate {
        entity: AuditEntity,
        entity_id: i64,
        field: String,
        #[source]
        source: StoreError,
    },

    #[error("Invalid value for field {field}: {value}")]
    InvalidFieldValue { field: String, value: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WorkflowError {
    /// Misconfiguration errors. Callers fall back to standard subscription
    /// behaviour instead of blocking the purchase or rebill.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            WorkflowError::BadWorkflowRelation { .. } | WorkflowError::WorkflowUnitNotFound(_)
        )
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors() {
        let relation = WorkflowError::BadWorkflowRelation {
            offer_id: 4,
            workflow_id: None,
        };
        assert!(relation.is_configuration());
        assert!(WorkflowError::WorkflowUnitNotFound("step 1".into()).is_configuration());

        let store = WorkflowError::Store(StoreError::Duplicate("line item".into()));
        assert!(!store.is_configuration());
    }

    #[test]
    fn test_store_errors_propagate_unmodified() {
        let err: WorkflowError = StoreError::Duplicate("line item 900/main".into()).into();
        assert_eq!(err.to_string(), "Duplicate record: line item 900/main");
    }
}
