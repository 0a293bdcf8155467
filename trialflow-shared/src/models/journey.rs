use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ActorId, OrderId, ProductId, UnitId, VariantId};

/// Position of an order within its main/upsell chain
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Main,
    Upsell,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Main => "main",
            OrderType::Upsell => "upsell",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "main" => Some(OrderType::Main),
            "upsell" => Some(OrderType::Upsell),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscription terms captured when a journey starts. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionSnapshot {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub price: i64,
    pub quantity: i32,
    pub billing_model_id: i64,
}

/// All line items descending from one initiating order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Journey {
    pub id: Uuid,
    pub initiating_order_id: OrderId,
    pub created_by: ActorId,
    pub created_at: DateTime<Utc>,
}

impl Journey {
    pub fn new(initiating_order_id: OrderId, created_by: ActorId) -> Self {
        Self {
            id: Uuid::new_v4(),
            initiating_order_id,
            created_by,
            created_at: Utc::now(),
        }
    }
}

/// Marks that one physical order occupies one unit within a journey
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    pub id: Uuid,
    pub journey_id: Uuid,
    pub order_id: OrderId,
    pub order_type: OrderType,
    pub unit_id: UnitId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub subscription: SubscriptionSnapshot,
    pub created_by: ActorId,
    pub created_at: DateTime<Utc>,
}

impl LineItem {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        journey_id: Uuid,
        order_id: OrderId,
        order_type: OrderType,
        unit_id: UnitId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        subscription: SubscriptionSnapshot,
        created_by: ActorId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            journey_id,
            order_id,
            order_type,
            unit_id,
            product_id,
            variant_id,
            subscription,
            created_by,
            created_at: Utc::now(),
        }
    }
}

/// A one-time paired product must ride on the next cycle's order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PairedProductDelay {
    pub id: Uuid,
    pub order_id: OrderId,
    pub line_item_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl PairedProductDelay {
    pub fn new(order_id: OrderId, line_item_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            line_item_id,
            created_at: Utc::now(),
        }
    }
}

/// One order of a main/upsell chain with the shippability of its current unit.
/// `unit_is_shippable` is `None` when the order is not enrolled in a workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainShipping {
    pub order_id: OrderId,
    pub order_type: OrderType,
    pub unit_is_shippable: Option<bool>,
}
