use std::sync::Arc;

use tracing::info;
use trialflow_core::{ActorContext, LineItemRepository, Repositories, WorkflowError, WorkflowResult};
use trialflow_shared::{
    Journey, LineItem, OfferId, OrderId, OrderType, ProductId, SubscriptionSnapshot, Unit,
    VariantId, WorkflowDefinition, WorkflowId, WorkflowOffer,
};
use uuid::Uuid;

use crate::definition::{UnitSet, WorkflowDefinitionResolver};
use crate::position::WorkflowPosition;

pub const FIRST_STEP: i32 = 1;

/// The order being enrolled at checkout
#[derive(Debug, Clone)]
pub struct Enrollment {
    pub order_id: OrderId,
    pub order_type: OrderType,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub subscription: SubscriptionSnapshot,
    /// Join an existing journey, e.g. an upsell bought with its main order.
    pub journey_id: Option<Uuid>,
}

/// Establishes step 1 for a freshly purchased, workflow-enrolled offer
pub struct InitialHandler {
    line_items: Arc<dyn LineItemRepository>,
    relation: WorkflowOffer,
    workflow: WorkflowDefinition,
    units: UnitSet,
    position: WorkflowPosition,
}

impl InitialHandler {
    pub async fn load(
        repos: &Repositories,
        offer_id: OfferId,
        workflow_id: Option<WorkflowId>,
    ) -> WorkflowResult<Self> {
        let resolved = WorkflowDefinitionResolver::new(repos.workflows.clone())
            .resolve_for_offer(offer_id, workflow_id)
            .await?;

        let position = WorkflowPosition::resolve(&resolved.units, FIRST_STEP).ok_or_else(|| {
            WorkflowError::WorkflowUnitNotFound(format!(
                "workflow {} has no unit at step {}",
                resolved.workflow.id, FIRST_STEP
            ))
        })?;

        info!(
            "Offer {} enrolls into workflow {} ({} units)",
            offer_id,
            resolved.workflow.id,
            resolved.units.len()
        );

        Ok(Self {
            line_items: repos.line_items.clone(),
            relation: resolved.relation,
            workflow: resolved.workflow,
            units: resolved.units,
            position,
        })
    }

    pub fn relation(&self) -> &WorkflowOffer {
        &self.relation
    }

    pub fn workflow(&self) -> &WorkflowDefinition {
        &self.workflow
    }

    pub fn position(&self) -> &WorkflowPosition {
        &self.position
    }

    pub fn current(&self) -> &Unit {
        &self.position.current
    }

    pub fn next(&self) -> Option<&Unit> {
        self.position.next.as_ref()
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Offset for the billing engine's cycle-depth counter so that regular
    /// numbering resumes once the workflow is exhausted.
    pub fn initial_cycle_depth(&self) -> i32 {
        -(1 + self.units.len() as i32)
    }

    /// Record the purchased order at step 1, opening a journey unless the
    /// enrollment names one.
    pub async fn enroll(&self, enrollment: Enrollment, actor: &ActorContext) -> WorkflowResult<LineItem> {
        let journey_id = match enrollment.journey_id {
            Some(id) => id,
            None => {
                let journey = Journey::new(enrollment.order_id, actor.actor_id);
                self.line_items.create_journey(&journey).await?;
                journey.id
            }
        };

        let item = LineItem::new(
            journey_id,
            enrollment.order_id,
            enrollment.order_type,
            self.position.current.id,
            enrollment.product_id,
            enrollment.variant_id,
            enrollment.subscription,
            actor.actor_id,
        );
        self.line_items.create_line_item(&item).await?;

        info!(
            "Enrolled {} order {} at step {} of workflow {} (journey {})",
            item.order_type, item.order_id, self.position.current.step_number, self.workflow.id, journey_id
        );

        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;

    async fn store_with_steps(steps: &[i32]) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store.insert_workflow(WorkflowDefinition::new(1, "Trial")).await;
        for step in steps {
            store.insert_unit(Unit::new(*step as i64, 1, *step)).await;
        }
        store.attach(1, 70, true).await;
        store
    }

    fn snapshot() -> SubscriptionSnapshot {
        SubscriptionSnapshot {
            product_id: 55,
            variant_id: Some(3),
            price: 100,
            quantity: 1,
            billing_model_id: 1,
        }
    }

    #[tokio::test]
    async fn test_initial_cycle_depth() {
        let store = store_with_steps(&[1, 2, 3]).await;
        let repos = Repositories::from_store(store);

        let handler = InitialHandler::load(&repos, 70, None).await.unwrap();

        assert_eq!(handler.initial_cycle_depth(), -4);
        assert_eq!(handler.current().step_number, 1);
        assert_eq!(handler.next().map(|u| u.step_number), Some(2));
    }

    #[tokio::test]
    async fn test_single_step_workflow() {
        let store = store_with_steps(&[1]).await;
        let repos = Repositories::from_store(store);

        let handler = InitialHandler::load(&repos, 70, None).await.unwrap();

        assert!(handler.next().is_none());
        assert_eq!(handler.initial_cycle_depth(), -2);
    }

    #[tokio::test]
    async fn test_missing_first_step() {
        let store = store_with_steps(&[2, 3]).await;
        let repos = Repositories::from_store(store);

        let result = InitialHandler::load(&repos, 70, None).await;
        assert!(matches!(result, Err(WorkflowError::WorkflowUnitNotFound(_))));
    }

    #[tokio::test]
    async fn test_offer_without_workflow() {
        let store = store_with_steps(&[1]).await;
        let repos = Repositories::from_store(store);

        let result = InitialHandler::load(&repos, 71, None).await;
        assert!(matches!(result, Err(WorkflowError::BadWorkflowRelation { offer_id: 71, .. })));

        let wrong_workflow = InitialHandler::load(&repos, 70, Some(8)).await;
        assert!(matches!(wrong_workflow, Err(WorkflowError::BadWorkflowRelation { .. })));
    }

    #[tokio::test]
    async fn test_enroll_main_and_upsell_share_journey() {
        let store = store_with_steps(&[1, 2]).await;
        let repos = Repositories::from_store(store.clone());
        let actor = ActorContext::new(12, "checkout");
        let handler = InitialHandler::load(&repos, 70, None).await.unwrap();

        let main = handler
            .enroll(
                Enrollment {
                    order_id: 500,
                    order_type: OrderType::Main,
                    product_id: 55,
                    variant_id: Some(3),
                    subscription: snapshot(),
                    journey_id: None,
                },
                &actor,
            )
            .await
            .unwrap();

        let upsell = handler
            .enroll(
                Enrollment {
                    order_id: 501,
                    order_type: OrderType::Upsell,
                    product_id: 56,
                    variant_id: None,
                    subscription: snapshot(),
                    journey_id: Some(main.journey_id),
                },
                &actor,
            )
            .await
            .unwrap();

        assert_eq!(main.unit_id, 1);
        assert_eq!(main.created_by, 12);
        assert_eq!(upsell.journey_id, main.journey_id);

        let journeys = store.journeys().await;
        assert_eq!(journeys.len(), 1);
        assert_eq!(journeys[0].initiating_order_id, 500);
        assert_eq!(store.line_items().await.len(), 2);
    }
}
