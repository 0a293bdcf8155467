use trialflow_core::{Repositories, WorkflowResult};
use trialflow_shared::OrderId;

use crate::main_order::MainOrderHandler;

/// Decline policy over the positions of a main order chain
pub struct DeclineManagerHandler {
    positions: MainOrderHandler,
}

impl DeclineManagerHandler {
    pub async fn load(repos: &Repositories, main_order_id: OrderId) -> WorkflowResult<Self> {
        Ok(Self::from(MainOrderHandler::load(repos, main_order_id).await?))
    }

    pub fn positions(&self) -> &MainOrderHandler {
        &self.positions
    }

    pub fn has_line_items_linked(&self) -> bool {
        self.positions.has_line_items_linked()
    }

    /// One cancellable step anywhere in the chain cancels the whole order
    /// once retries run out.
    pub fn should_cancel_parent_on_max_retries(&self) -> bool {
        self.positions
            .linked_units()
            .any(|unit| unit.is_parent_cancellable)
    }
}

impl From<MainOrderHandler> for DeclineManagerHandler {
    fn from(positions: MainOrderHandler) -> Self {
        Self { positions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::main_order::tests::link;
    use crate::memory::InMemoryStore;
    use std::sync::Arc;
    use trialflow_shared::{OrderType, Unit};

    fn unit(id: i64, cancellable: bool) -> Unit {
        let mut unit = Unit::new(id, 1, id as i32);
        unit.is_parent_cancellable = cancellable;
        unit
    }

    async fn chain(main: bool, first: bool, second: bool) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store.link_upsell(10, 11).await;
        store.link_upsell(10, 12).await;
        link(&store, 10, OrderType::Main, unit(1, main)).await;
        link(&store, 11, OrderType::Upsell, unit(2, first)).await;
        link(&store, 12, OrderType::Upsell, unit(3, second)).await;
        store
    }

    #[tokio::test]
    async fn test_any_cancellable_position_cancels() {
        for flags in [(true, false, false), (false, true, false), (false, false, true)] {
            let store = chain(flags.0, flags.1, flags.2).await;
            let repos = Repositories::from_store(store);
            let handler = DeclineManagerHandler::load(&repos, 10).await.unwrap();
            assert!(handler.should_cancel_parent_on_max_retries(), "{:?}", flags);
        }
    }

    #[tokio::test]
    async fn test_no_cancellable_position() {
        let store = chain(false, false, false).await;
        let repos = Repositories::from_store(store);
        let handler = DeclineManagerHandler::load(&repos, 10).await.unwrap();
        assert!(!handler.should_cancel_parent_on_max_retries());
    }

    #[tokio::test]
    async fn test_nothing_linked_never_cancels() {
        let store = Arc::new(InMemoryStore::new());
        let repos = Repositories::from_store(store);
        let handler = DeclineManagerHandler::load(&repos, 10).await.unwrap();

        assert!(!handler.has_line_items_linked());
        assert!(!handler.should_cancel_parent_on_max_retries());
    }
}
