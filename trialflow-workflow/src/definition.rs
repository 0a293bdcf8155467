use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};
use trialflow_core::{WorkflowError, WorkflowRepository, WorkflowResult};
use trialflow_shared::{OfferId, Unit, WorkflowDefinition, WorkflowId, WorkflowOffer};

/// The live units of a workflow keyed by step number
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitSet {
    units: BTreeMap<i32, Unit>,
}

impl UnitSet {
    /// Deleted units are dropped. Step numbers are expected to be unique; on a
    /// collision the first unit seen wins.
    pub fn new(units: impl IntoIterator<Item = Unit>) -> Self {
        let mut by_step: BTreeMap<i32, Unit> = BTreeMap::new();
        for unit in units {
            if unit.lifecycle.is_deleted() {
                continue;
            }
            if let Some(existing) = by_step.get(&unit.step_number) {
                warn!(
                    "Workflow {} has units {} and {} at step {}, keeping {}",
                    unit.workflow_id, existing.id, unit.id, unit.step_number, existing.id
                );
                continue;
            }
            by_step.insert(unit.step_number, unit);
        }
        Self { units: by_step }
    }

    pub fn at(&self, step_number: i32) -> Option<&Unit> {
        self.units.get(&step_number)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }
}

/// A workflow as seen from an enrolled order
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedWorkflow {
    pub workflow: Option<WorkflowDefinition>,
    pub units: UnitSet,
}

impl ResolvedWorkflow {
    /// The definition exists and has not been deleted.
    pub fn is_loaded(&self) -> bool {
        self.workflow
            .as_ref()
            .is_some_and(|workflow| !workflow.lifecycle.is_deleted())
    }
}

/// A workflow reached through its offer attachment
#[derive(Debug, Clone, PartialEq)]
pub struct OfferWorkflow {
    pub relation: WorkflowOffer,
    pub workflow: WorkflowDefinition,
    pub units: UnitSet,
}

/// Loads workflow definitions and their units
#[derive(Clone)]
pub struct WorkflowDefinitionResolver {
    workflows: Arc<dyn WorkflowRepository>,
}

impl WorkflowDefinitionResolver {
    pub fn new(workflows: Arc<dyn WorkflowRepository>) -> Self {
        Self { workflows }
    }

    /// Resolve the workflow a purchase of `offer_id` enrolls into. Only active
    /// workflows accept new enrollments.
    pub async fn resolve_for_offer(
        &self,
        offer_id: OfferId,
        workflow_id: Option<WorkflowId>,
    ) -> WorkflowResult<OfferWorkflow> {
        let bad_relation = || WorkflowError::BadWorkflowRelation {
            offer_id,
            workflow_id,
        };

        let relation = self
            .workflows
            .find_workflow_offer(offer_id, workflow_id)
            .await?
            .ok_or_else(bad_relation)?;

        let workflow = self
            .workflows
            .find_workflow(relation.workflow_id)
            .await?
            .ok_or_else(bad_relation)?;

        if !workflow.lifecycle.is_active() {
            debug!(
                "Workflow {} attached to offer {} is {}",
                workflow.id,
                offer_id,
                workflow.lifecycle.as_str()
            );
            return Err(bad_relation());
        }

        let units = UnitSet::new(self.workflows.list_units(workflow.id).await?);

        Ok(OfferWorkflow {
            relation,
            workflow,
            units,
        })
    }

    pub async fn resolve_for_workflow(&self, workflow_id: WorkflowId) -> WorkflowResult<ResolvedWorkflow> {
        let workflow = self.workflows.find_workflow(workflow_id).await?;
        let units = UnitSet::new(self.workflows.list_units(workflow_id).await?);
        Ok(ResolvedWorkflow { workflow, units })
    }
}
