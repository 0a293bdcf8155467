pub mod models;

pub use models::{
    AuditEntity, AuditRecord, ChainShipping, Journey, Lifecycle, LineItem, OrderType,
    PairedProductDelay, SubscriptionSnapshot, Unit, WorkflowDefinition, WorkflowOffer,
};

pub type WorkflowId = i64;
pub type UnitId = i64;
pub type OfferId = i64;
pub type OrderId = i64;
pub type ProductId = i64;
pub type VariantId = i64;
pub type ActorId = i64;
