pub mod audit;
pub mod decline;
pub mod definition;
pub mod initial;
pub mod main_order;
pub mod memory;
pub mod notification;
pub mod position;
pub mod rebill;
pub mod shippable;

pub use audit::{AuditStage, Auditable, StagedChange, UnitAuditStage, WorkflowAuditStage};
pub use decline::DeclineManagerHandler;
pub use definition::{OfferWorkflow, ResolvedWorkflow, UnitSet, WorkflowDefinitionResolver};
pub use initial::{Enrollment, InitialHandler};
pub use main_order::{LinkedPosition, MainOrderHandler};
pub use memory::InMemoryStore;
pub use notification::NotificationHandler;
pub use position::WorkflowPosition;
pub use rebill::{RebillHandler, RecurringOverrides};
pub use shippable::{ShippableOrderFilter, ShippableOrders};
