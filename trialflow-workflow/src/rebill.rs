use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};
use trialflow_core::{ActorContext, LineItemRepository, Repositories, WorkflowError, WorkflowResult};
use trialflow_shared::{
    LineItem, OrderId, OrderType, PairedProductDelay, ProductId, Unit, VariantId,
};

use crate::definition::{ResolvedWorkflow, WorkflowDefinitionResolver};
use crate::position::WorkflowPosition;

/// Overrides the billing engine applies to the upcoming cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecurringOverrides {
    next_product_id: Option<ProductId>,
    days: Option<i32>,
    price: Option<i64>,
    mark_unshippable: bool,
}

impl RecurringOverrides {
    pub fn has_custom_next_product_id(&self) -> bool {
        self.next_product_id.is_some()
    }

    pub fn custom_next_product_id(&self) -> Option<ProductId> {
        self.next_product_id
    }

    pub fn has_custom_days(&self) -> bool {
        self.days.is_some()
    }

    pub fn custom_days(&self) -> Option<i32> {
        self.days
    }

    /// Price for the upcoming cycle only. Never written back to the line item.
    pub fn custom_price(&self) -> Option<i64> {
        self.price
    }

    pub fn mark_unshippable(&self) -> bool {
        self.mark_unshippable
    }
}

/// Advances an enrolled order to the next step of its workflow
pub struct RebillHandler {
    line_items: Arc<dyn LineItemRepository>,
    workflow: ResolvedWorkflow,
    line_item: LineItem,
    position: WorkflowPosition,
}

impl RebillHandler {
    /// Load the position of `parent_order_id`. The order must be enrolled.
    pub async fn load(
        repos: &Repositories,
        parent_order_id: OrderId,
        order_type: OrderType,
    ) -> WorkflowResult<Self> {
        let line_item = repos
            .line_items
            .find_line_item(parent_order_id, order_type)
            .await?
            .ok_or_else(|| {
                WorkflowError::WorkflowUnitNotFound(format!(
                    "no line item for {} order {}",
                    order_type, parent_order_id
                ))
            })?;

        let current = repos
            .workflows
            .find_unit(line_item.unit_id)
            .await?
            .ok_or_else(|| {
                WorkflowError::WorkflowUnitNotFound(format!(
                    "unit {} of {} order {}",
                    line_item.unit_id, order_type, parent_order_id
                ))
            })?;

        let workflow = WorkflowDefinitionResolver::new(repos.workflows.clone())
            .resolve_for_workflow(current.workflow_id)
            .await?;
        let position = WorkflowPosition::around(current, &workflow.units);

        debug!(
            "{} order {} is at step {} of workflow {}",
            order_type, parent_order_id, position.current.step_number, position.current.workflow_id
        );

        Ok(Self {
            line_items: repos.line_items.clone(),
            workflow,
            line_item,
            position,
        })
    }

    pub fn line_item(&self) -> &LineItem {
        &self.line_item
    }

    pub fn position(&self) -> &WorkflowPosition {
        &self.position
    }

    pub fn current(&self) -> &Unit {
        &self.position.current
    }

    pub fn previous(&self) -> Option<&Unit> {
        self.position.previous.as_ref()
    }

    pub fn next(&self) -> Option<&Unit> {
        self.position.next.as_ref()
    }

    pub fn next_child(&self) -> Option<&Unit> {
        self.position.next_child.as_ref()
    }

    /// The order sits on the last reachable step.
    pub fn is_exhausted(&self) -> bool {
        self.position.is_terminal()
    }

    pub fn can_process_recurring_values(&self) -> bool {
        self.workflow.is_loaded()
    }

    pub fn process_recurring_values(&self) -> RecurringOverrides {
        if !self.can_process_recurring_values() {
            debug!(
                "Workflow {} is not loaded, keeping billing defaults for order {}",
                self.position.current.workflow_id, self.line_item.order_id
            );
            return RecurringOverrides::default();
        }

        match &self.position.next {
            Some(next) => RecurringOverrides {
                next_product_id: next.custom_product_id(),
                days: next.custom_duration(),
                price: next.custom_price(),
                mark_unshippable: !next.is_shippable,
            },
            // exhausted: hand the subscription back to its original product
            None => RecurringOverrides {
                next_product_id: Some(self.line_item.subscription.product_id),
                ..RecurringOverrides::default()
            },
        }
    }

    /// Record that `new_order_id` occupies the next step. Does nothing once the
    /// workflow is exhausted.
    pub async fn save_new_line_item(
        &self,
        new_order_id: OrderId,
        order_type: OrderType,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        actor: &ActorContext,
    ) -> WorkflowResult<Option<LineItem>> {
        let Some(next) = &self.position.next else {
            debug!(
                "Order {} completed workflow {}, no line item for order {}",
                self.line_item.order_id, self.position.current.workflow_id, new_order_id
            );
            return Ok(None);
        };

        let item = LineItem::new(
            self.line_item.journey_id,
            new_order_id,
            order_type,
            next.id,
            product_id,
            variant_id,
            self.line_item.subscription.clone(),
            actor.actor_id,
        );
        self.line_items.create_line_item(&item).await?;

        if next.should_delay_paired_product() {
            let delay = PairedProductDelay::new(new_order_id, item.id);
            self.line_items.create_paired_product_delay(&delay).await?;
            debug!("Delayed paired product for order {}", new_order_id);
        }

        info!(
            "{} order {} advanced to step {} of workflow {}",
            order_type, new_order_id, next.step_number, next.workflow_id
        );

        Ok(Some(item))
    }
}
