use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use trialflow_core::{OrderChainRepository, WorkflowResult};
use trialflow_shared::{ChainShipping, OrderId, OrderType};

/// Shipping partition of a main order chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShippableOrders {
    pub shippable_main_id: Option<OrderId>,
    pub unshippable_main_id: Option<OrderId>,
    pub shippable_upsell_ids: Vec<OrderId>,
    pub unshippable_upsell_ids: Vec<OrderId>,
}

impl ShippableOrders {
    /// Orders without a line item are outside workflow control and ship.
    pub fn partition(rows: impl IntoIterator<Item = ChainShipping>) -> Self {
        let mut orders = Self::default();
        for row in rows {
            let shippable = row.unit_is_shippable.unwrap_or(true);
            match (row.order_type, shippable) {
                (OrderType::Main, true) => orders.shippable_main_id = Some(row.order_id),
                (OrderType::Main, false) => orders.unshippable_main_id = Some(row.order_id),
                (OrderType::Upsell, true) => orders.shippable_upsell_ids.push(row.order_id),
                (OrderType::Upsell, false) => orders.unshippable_upsell_ids.push(row.order_id),
            }
        }
        orders
    }

    pub fn has_shippable_orders(&self) -> bool {
        self.shippable_main_id.is_some() || !self.shippable_upsell_ids.is_empty()
    }

    /// Every order of the chain that goes into a fulfillment batch.
    pub fn shippable_order_ids(&self) -> Vec<OrderId> {
        self.shippable_main_id
            .into_iter()
            .chain(self.shippable_upsell_ids.iter().copied())
            .collect()
    }
}

/// Splits a main order chain into shippable and unshippable orders
pub struct ShippableOrderFilter {
    chains: Arc<dyn OrderChainRepository>,
}

impl ShippableOrderFilter {
    pub fn new(chains: Arc<dyn OrderChainRepository>) -> Self {
        Self { chains }
    }

    pub async fn filter(&self, main_order_id: OrderId) -> WorkflowResult<ShippableOrders> {
        let rows = self.chains.list_chain_shipping(main_order_id).await?;
        let orders = ShippableOrders::partition(rows);
        debug!(
            "Order {}: {} shippable, {} unshippable upsells",
            main_order_id,
            orders.shippable_upsell_ids.len(),
            orders.unshippable_upsell_ids.len()
        );
        Ok(orders)
    }
}
