use serde::Serialize;
use trialflow_core::{Repositories, WorkflowError, WorkflowResult};
use trialflow_shared::{LineItem, OrderId, OrderType, Unit};

/// A line item together with the unit it points at
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkedPosition {
    pub line_item: LineItem,
    pub unit: Unit,
}

/// Current positions of a main order and the upsells chained to it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MainOrderHandler {
    main_order_id: OrderId,
    main: Option<LinkedPosition>,
    upsells: Vec<LinkedPosition>,
}

impl MainOrderHandler {
    pub async fn load(repos: &Repositories, main_order_id: OrderId) -> WorkflowResult<Self> {
        let main = load_position(repos, main_order_id, OrderType::Main).await?;

        let mut upsells = Vec::new();
        for upsell_id in repos.chains.list_upsell_order_ids(main_order_id).await? {
            if let Some(position) = load_position(repos, upsell_id, OrderType::Upsell).await? {
                upsells.push(position);
            }
        }

        Ok(Self {
            main_order_id,
            main,
            upsells,
        })
    }

    pub fn main_order_id(&self) -> OrderId {
        self.main_order_id
    }

    pub fn main_position(&self) -> Option<&LinkedPosition> {
        self.main.as_ref()
    }

    pub fn upsell_positions(&self) -> &[LinkedPosition] {
        &self.upsells
    }

    pub fn has_main_line_item(&self) -> bool {
        self.main.is_some()
    }

    pub fn has_upsell_line_items(&self) -> bool {
        !self.upsells.is_empty()
    }

    pub fn has_line_items_linked(&self) -> bool {
        self.has_main_line_item() || self.has_upsell_line_items()
    }

    /// Units of every linked position, main first.
    pub fn linked_units(&self) -> impl Iterator<Item = &Unit> {
        self.main.iter().chain(self.upsells.iter()).map(|p| &p.unit)
    }
}

async fn load_position(
    repos: &Repositories,
    order_id: OrderId,
    order_type: OrderType,
) -> WorkflowResult<Option<LinkedPosition>> {
    let Some(line_item) = repos.line_items.find_line_item(order_id, order_type).await? else {
        return Ok(None);
    };

    let unit = repos
        .workflows
        .find_unit(line_item.unit_id)
        .await?
        .ok_or_else(|| {
            WorkflowError::WorkflowUnitNotFound(format!(
                "unit {} of {} order {}",
                line_item.unit_id, order_type, order_id
            ))
        })?;

    Ok(Some(LinkedPosition { line_item, unit }))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use std::sync::Arc;
    use trialflow_core::LineItemRepository;
    use trialflow_shared::SubscriptionSnapshot;
    use uuid::Uuid;

    /// Enroll `order_id` at `unit`, storing the unit as well.
    pub(crate) async fn link(store: &InMemoryStore, order_id: OrderId, order_type: OrderType, unit: Unit) {
        let item = LineItem::new(
            Uuid::new_v4(),
            order_id,
            order_type,
            unit.id,
            55,
            None,
            SubscriptionSnapshot {
                product_id: 55,
                variant_id: None,
                price: 1000,
                quantity: 1,
                billing_model_id: 1,
            },
            0,
        );
        store.insert_unit(unit).await;
        store.create_line_item(&item).await.unwrap();
    }

    #[tokio::test]
    async fn test_nothing_linked() {
        let store = Arc::new(InMemoryStore::new());
        store.link_upsell(10, 11).await;
        let repos = Repositories::from_store(store);

        let handler = MainOrderHandler::load(&repos, 10).await.unwrap();

        assert!(!handler.has_main_line_item());
        assert!(!handler.has_upsell_line_items());
        assert!(!handler.has_line_items_linked());
        assert_eq!(handler.linked_units().count(), 0);
    }

    #[tokio::test]
    async fn test_only_enrolled_upsells_are_linked() {
        let store = Arc::new(InMemoryStore::new());
        store.link_upsell(10, 11).await;
        store.link_upsell(10, 12).await;
        link(&store, 12, OrderType::Upsell, Unit::new(2, 1, 1)).await;
        let repos = Repositories::from_store(store);

        let handler = MainOrderHandler::load(&repos, 10).await.unwrap();

        assert!(!handler.has_main_line_item());
        assert!(handler.has_upsell_line_items());
        assert!(handler.has_line_items_linked());
        assert_eq!(handler.upsell_positions().len(), 1);
        assert_eq!(handler.upsell_positions()[0].line_item.order_id, 12);
    }

    #[tokio::test]
    async fn test_main_line_item_ignores_upsell_type() {
        let store = Arc::new(InMemoryStore::new());
        // order 10 enrolled only as an upsell elsewhere
        link(&store, 10, OrderType::Upsell, Unit::new(1, 1, 1)).await;
        let repos = Repositories::from_store(store);

        let handler = MainOrderHandler::load(&repos, 10).await.unwrap();
        assert!(!handler.has_main_line_item());
    }
}
