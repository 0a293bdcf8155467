pub mod audit;
pub mod journey;
pub mod workflow;

pub use audit::{AuditEntity, AuditRecord};
pub use journey::{ChainShipping, Journey, LineItem, OrderType, PairedProductDelay, SubscriptionSnapshot};
pub use workflow::{Lifecycle, Unit, WorkflowDefinition, WorkflowOffer};
