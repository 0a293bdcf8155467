use trialflow_core::{Repositories, WorkflowResult};
use trialflow_shared::OrderId;

use crate::main_order::MainOrderHandler;

/// Confirmation policy over the positions of a main order chain
pub struct NotificationHandler {
    positions: MainOrderHandler,
}

impl NotificationHandler {
    pub async fn load(repos: &Repositories, main_order_id: OrderId) -> WorkflowResult<Self> {
        Ok(Self::from(MainOrderHandler::load(repos, main_order_id).await?))
    }

    pub fn positions(&self) -> &MainOrderHandler {
        &self.positions
    }

    pub fn has_line_items_linked(&self) -> bool {
        self.positions.has_line_items_linked()
    }

    pub fn should_suppress_order_confirmation(&self) -> bool {
        self.positions.linked_units().any(|unit| !unit.is_notifiable)
    }
}

impl From<MainOrderHandler> for NotificationHandler {
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

    #[tokio::test]
    async fn test_silent_upsell_suppresses_confirmation() {
        let store = Arc::new(InMemoryStore::new());
        store.link_upsell(20, 21).await;
        link(&store, 20, OrderType::Main, Unit::new(1, 1, 1)).await;
        let mut silent = Unit::new(2, 1, 2);
        silent.is_notifiable = false;
        link(&store, 21, OrderType::Upsell, silent).await;
        let repos = Repositories::from_store(store);

        let handler = NotificationHandler::load(&repos, 20).await.unwrap();
        assert!(handler.should_suppress_order_confirmation());
    }

    #[tokio::test]
    async fn test_notifiable_chain_sends_confirmation() {
        let store = Arc::new(InMemoryStore::new());
        link(&store, 20, OrderType::Main, Unit::new(1, 1, 1)).await;
        let repos = Repositories::from_store(store);

        let handler = NotificationHandler::load(&repos, 20).await.unwrap();
        assert!(handler.has_line_items_linked());
        assert!(!handler.should_suppress_order_confirmation());

        let unlinked = NotificationHandler::load(&repos, 30).await.unwrap();
        assert!(!unlinked.has_line_items_linked());
        assert!(!unlinked.should_suppress_order_confirmation());
    }
}
