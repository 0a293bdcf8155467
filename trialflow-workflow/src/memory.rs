use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use trialflow_core::{
    AuditRepository, LineItemRepository, OrderChainRepository, StoreError, StoreResult,
    WorkflowRepository,
};
use trialflow_shared::{
    AuditRecord, ChainShipping, Journey, LineItem, OfferId, OrderId, OrderType,
    PairedProductDelay, Unit, UnitId, WorkflowDefinition, WorkflowId, WorkflowOffer,
};
use uuid::Uuid;

#[derive(Default)]
struct State {
    workflows: HashMap<WorkflowId, WorkflowDefinition>,
    units: HashMap<UnitId, Unit>,
    offers: Vec<WorkflowOffer>,
    journeys: HashMap<Uuid, Journey>,
    line_items: Vec<LineItem>,
    delays: Vec<PairedProductDelay>,
    upsells: HashMap<OrderId, Vec<OrderId>>,
    audit: Vec<AuditRecord>,
    audit_capacity: Option<usize>,
}

/// HashMap-backed store implementing every repository, for tests and
/// embedders without a database.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_workflow(&self, workflow: WorkflowDefinition) {
        self.state.write().await.workflows.insert(workflow.id, workflow);
    }

    pub async fn insert_unit(&self, unit: Unit) {
        self.state.write().await.units.insert(unit.id, unit);
    }

    /// Attach a workflow to an offer with the same default handling as
    /// `WorkflowRepository::attach_offer`.
    pub async fn attach(&self, workflow_id: WorkflowId, offer_id: OfferId, is_default: bool) {
        let mut state = self.state.write().await;
        attach_relation(
            &mut state,
            WorkflowOffer {
                workflow_id,
                offer_id,
                is_default,
            },
        );
    }

    /// Chain an upsell order to a main order.
    pub async fn link_upsell(&self, main_order_id: OrderId, upsell_order_id: OrderId) {
        self.state
            .write()
            .await
            .upsells
            .entry(main_order_id)
            .or_default()
            .push(upsell_order_id);
    }

    /// Accept only `capacity` more audit inserts; later ones fail.
    pub async fn limit_audit_inserts(&self, capacity: usize) {
        self.state.write().await.audit_capacity = Some(capacity);
    }

    pub async fn journeys(&self) -> Vec<Journey> {
        self.state.read().await.journeys.values().cloned().collect()
    }

    pub async fn line_items(&self) -> Vec<LineItem> {
        self.state.read().await.line_items.clone()
    }

    pub async fn paired_product_delays(&self) -> Vec<PairedProductDelay> {
        self.state.read().await.delays.clone()
    }

    pub async fn audit_records(&self) -> Vec<AuditRecord> {
        self.state.read().await.audit.clone()
    }

    pub async fn workflow_offers(&self) -> Vec<WorkflowOffer> {
        self.state.read().await.offers.clone()
    }
}

fn attach_relation(state: &mut State, relation: WorkflowOffer) {
    if relation.is_default {
        for existing in state.offers.iter_mut() {
            if existing.offer_id == relation.offer_id {
                existing.is_default = false;
            }
        }
    }

    match state
        .offers
        .iter_mut()
        .find(|o| o.offer_id == relation.offer_id && o.workflow_id == relation.workflow_id)
    {
        Some(existing) => existing.is_default = relation.is_default,
        None => state.offers.push(relation),
    }
}

#[async_trait]
impl WorkflowRepository for InMemoryStore {
    async fn find_workflow(&self, id: WorkflowId) -> StoreResult<Option<WorkflowDefinition>> {
        Ok(self.state.read().await.workflows.get(&id).cloned())
    }

    async fn find_workflow_offer(
        &self,
        offer_id: OfferId,
        workflow_id: Option<WorkflowId>,
    ) -> StoreResult<Option<WorkflowOffer>> {
        let state = self.state.read().await;
        let relation = state.offers.iter().find(|o| {
            o.offer_id == offer_id
                && match workflow_id {
                    Some(id) => o.workflow_id == id,
                    None => o.is_default,
                }
        });
        Ok(relation.cloned())
    }

    async fn list_units(&self, workflow_id: WorkflowId) -> StoreResult<Vec<Unit>> {
        let state = self.state.read().await;
        let mut units: Vec<Unit> = state
            .units
            .values()
            .filter(|u| u.workflow_id == workflow_id)
            .cloned()
            .collect();
        units.sort_by_key(|u| (u.step_number, u.id));
        Ok(units)
    }

    async fn find_unit(&self, id: UnitId) -> StoreResult<Option<Unit>> {
        Ok(self.state.read().await.units.get(&id).cloned())
    }

    async fn attach_offer(&self, relation: &WorkflowOffer) -> StoreResult<()> {
        let mut state = self.state.write().await;
        attach_relation(&mut state, relation.clone());
        Ok(())
    }
}

#[async_trait]
impl LineItemRepository for InMemoryStore {
    async fn create_journey(&self, journey: &Journey) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.journeys.contains_key(&journey.id) {
            return Err(StoreError::Duplicate(format!("journey {}", journey.id)));
        }
        state.journeys.insert(journey.id, journey.clone());
        Ok(())
    }

    async fn find_line_item(
        &self,
        order_id: OrderId,
        order_type: OrderType,
    ) -> StoreResult<Option<LineItem>> {
        let state = self.state.read().await;
        let item = state
            .line_items
            .iter()
            .rev()
            .find(|i| i.order_id == order_id && i.order_type == order_type);
        Ok(item.cloned())
    }

    async fn create_line_item(&self, item: &LineItem) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let duplicate = state.line_items.iter().any(|i| {
            i.journey_id == item.journey_id
                && i.order_id == item.order_id
                && i.order_type == item.order_type
        });
        if duplicate {
            return Err(StoreError::Duplicate(format!(
                "line item for {} order {} in journey {}",
                item.order_type, item.order_id, item.journey_id
            )));
        }
        state.line_items.push(item.clone());
        Ok(())
    }

    async fn create_paired_product_delay(&self, delay: &PairedProductDelay) -> StoreResult<()> {
        self.state.write().await.delays.push(delay.clone());
        Ok(())
    }

    async fn find_paired_product_delay(
        &self,
        order_id: OrderId,
    ) -> StoreResult<Option<PairedProductDelay>> {
        let state = self.state.read().await;
        Ok(state.delays.iter().find(|d| d.order_id == order_id).cloned())
    }

    async fn clear_paired_product_delay(&self, order_id: OrderId) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let before = state.delays.len();
        state.delays.retain(|d| d.order_id != order_id);
        Ok(state.delays.len() != before)
    }
}

#[async_trait]
impl OrderChainRepository for InMemoryStore {
    async fn list_upsell_order_ids(&self, main_order_id: OrderId) -> StoreResult<Vec<OrderId>> {
        let state = self.state.read().await;
        Ok(state.upsells.get(&main_order_id).cloned().unwrap_or_default())
    }

    async fn list_chain_shipping(&self, main_order_id: OrderId) -> StoreResult<Vec<ChainShipping>> {
        let state = self.state.read().await;

        let shippable = |order_id: OrderId, order_type: OrderType| {
            state
                .line_items
                .iter()
                .rev()
                .find(|i| i.order_id == order_id && i.order_type == order_type)
                .and_then(|i| state.units.get(&i.unit_id))
                .map(|u| u.is_shippable)
        };

        let mut rows = vec![ChainShipping {
            order_id: main_order_id,
            order_type: OrderType::Main,
            unit_is_shippable: shippable(main_order_id, OrderType::Main),
        }];

        for upsell_id in state.upsells.get(&main_order_id).into_iter().flatten() {
            rows.push(ChainShipping {
                order_id: *upsell_id,
                order_type: OrderType::Upsell,
                unit_is_shippable: shippable(*upsell_id, OrderType::Upsell),
            });
        }

        Ok(rows)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("audit store rejected record {0}")]
struct AuditRejected(Uuid);

#[async_trait]
impl AuditRepository for InMemoryStore {
    async fn insert_audit_record(&self, record: &AuditRecord) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if let Some(capacity) = state.audit_capacity.as_mut() {
            if *capacity == 0 {
                return Err(StoreError::backend(AuditRejected(record.id)));
            }
            *capacity -= 1;
        }
        state.audit.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trialflow_shared::SubscriptionSnapshot;

    fn snapshot() -> SubscriptionSnapshot {
        SubscriptionSnapshot {
            product_id: 55,
            variant_id: None,
            price: 4999,
            quantity: 1,
            billing_model_id: 2,
        }
    }

    #[tokio::test]
    async fn test_attach_keeps_single_default() {
        let store = InMemoryStore::new();
        store.attach(1, 10, true).await;
        store.attach(2, 10, true).await;
        store.attach(3, 11, true).await;

        let defaults: Vec<_> = store
            .workflow_offers()
            .await
            .into_iter()
            .filter(|o| o.is_default)
            .map(|o| (o.workflow_id, o.offer_id))
            .collect();

        assert_eq!(defaults, vec![(2, 10), (3, 11)]);
    }

    #[tokio::test]
    async fn test_duplicate_line_item_in_journey() {
        let store = InMemoryStore::new();
        let journey = Uuid::new_v4();
        let item = LineItem::new(journey, 900, OrderType::Main, 1, 55, None, snapshot(), 0);

        store.create_line_item(&item).await.unwrap();
        let again = LineItem::new(journey, 900, OrderType::Main, 2, 55, None, snapshot(), 0);
        let result = store.create_line_item(&again).await;
        assert!(matches!(result, Err(StoreError::Duplicate(_))));

        // the same order as an upsell is a different position
        let upsell = LineItem::new(journey, 900, OrderType::Upsell, 1, 55, None, snapshot(), 0);
        store.create_line_item(&upsell).await.unwrap();
    }

    #[tokio::test]
    async fn test_clear_paired_product_delay() {
        let store = InMemoryStore::new();
        store
            .create_paired_product_delay(&PairedProductDelay::new(900, Uuid::new_v4()))
            .await
            .unwrap();

        assert!(store.find_paired_product_delay(900).await.unwrap().is_some());
        assert!(store.clear_paired_product_delay(900).await.unwrap());
        assert!(!store.clear_paired_product_delay(900).await.unwrap());
        assert!(store.find_paired_product_delay(900).await.unwrap().is_none());
    }
}
