use std::sync::Arc;

use async_trait::async_trait;
use trialflow_shared::{
    AuditRecord, ChainShipping, Journey, LineItem, OfferId, OrderId, OrderType,
    PairedProductDelay, Unit, UnitId, WorkflowDefinition, WorkflowId, WorkflowOffer,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error(transparent)]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read access to authored workflow configuration
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    async fn find_workflow(&self, id: WorkflowId) -> StoreResult<Option<WorkflowDefinition>>;

    /// With an explicit workflow id, the relation between that workflow and the
    /// offer; otherwise the offer's default relation.
    async fn find_workflow_offer(
        &self,
        offer_id: OfferId,
        workflow_id: Option<WorkflowId>,
    ) -> StoreResult<Option<WorkflowOffer>>;

    /// Units of a workflow, deleted ones included.
    async fn list_units(&self, workflow_id: WorkflowId) -> StoreResult<Vec<Unit>>;

    async fn find_unit(&self, id: UnitId) -> StoreResult<Option<Unit>>;

    /// Attach a workflow to an offer. Attaching as default clears the default
    /// flag on the offer's other relations.
    async fn attach_offer(&self, relation: &WorkflowOffer) -> StoreResult<()>;
}

/// Journey and position bookkeeping
#[async_trait]
pub trait LineItemRepository: Send + Sync {
    async fn create_journey(&self, journey: &Journey) -> StoreResult<()>;

    async fn find_line_item(
        &self,
        order_id: OrderId,
        order_type: OrderType,
    ) -> StoreResult<Option<LineItem>>;

    /// Fails with `StoreError::Duplicate` when the journey already holds a
    /// line item for the same order and type.
    async fn create_line_item(&self, item: &LineItem) -> StoreResult<()>;

    async fn create_paired_product_delay(&self, delay: &PairedProductDelay) -> StoreResult<()>;

    async fn find_paired_product_delay(
        &self,
        order_id: OrderId,
    ) -> StoreResult<Option<PairedProductDelay>>;

    /// Returns whether a delay was removed.
    async fn clear_paired_product_delay(&self, order_id: OrderId) -> StoreResult<bool>;
}

/// Main/upsell order chains owned by the billing system
#[async_trait]
pub trait OrderChainRepository: Send + Sync {
    async fn list_upsell_order_ids(&self, main_order_id: OrderId) -> StoreResult<Vec<OrderId>>;

    /// The main order and each chained upsell joined to its current unit.
    async fn list_chain_shipping(&self, main_order_id: OrderId) -> StoreResult<Vec<ChainShipping>>;
}

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn insert_audit_record(&self, record: &AuditRecord) -> StoreResult<()>;
}

/// Repository handles shared by the workflow handlers
#[derive(Clone)]
pub struct Repositories {
    pub workflows: Arc<dyn WorkflowRepository>,
    pub line_items: Arc<dyn LineItemRepository>,
    pub chains: Arc<dyn OrderChainRepository>,
    pub audit: Arc<dyn AuditRepository>,
}

impl Repositories {
    /// Bundle a single store that implements every repository.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: WorkflowRepository + LineItemRepository + OrderChainRepository + AuditRepository + 'static,
    {
        Self {
            workflows: store.clone(),
            line_items: store.clone(),
            chains: store.clone(),
            audit: store,
        }
    }
}
