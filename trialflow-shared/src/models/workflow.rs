use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ActorId, OfferId, ProductId, UnitId, WorkflowId};

/// Authoring state shared by workflows and their units.
///
/// Replaces the legacy `deleted` + `active` flag pair, so a record can no
/// longer be both deleted and active.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Lifecycle {
    Active,
    Inactive,
    Deleted,
}

impl Lifecycle {
    pub fn is_active(&self) -> bool {
        matches!(self, Lifecycle::Active)
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Lifecycle::Deleted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Active => "ACTIVE",
            Lifecycle::Inactive => "INACTIVE",
            Lifecycle::Deleted => "DELETED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ACTIVE" => Some(Lifecycle::Active),
            "INACTIVE" => Some(Lifecycle::Inactive),
            "DELETED" => Some(Lifecycle::Deleted),
            _ => None,
        }
    }
}

/// A named, ordered sequence of billing steps attachable to offers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowDefinition {
    pub id: WorkflowId,
    pub name: String,
    pub lifecycle: Lifecycle,
    pub created_by: Option<ActorId>,
    pub updated_by: Option<ActorId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowDefinition {
    pub fn new(id: WorkflowId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            lifecycle: Lifecycle::Active,
            created_by: None,
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One step of a workflow and the overrides applied to the cycle billed at it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Unit {
    pub id: UnitId,
    pub workflow_id: WorkflowId,
    pub name: String,
    pub step_number: i32,
    /// Cycle length in days; zero or absent keeps the billing model's default.
    pub duration: Option<i32>,
    /// Product billed at this step; zero or absent keeps the subscription's product.
    pub product_id: Option<ProductId>,
    /// Price in cents for this step's cycle.
    pub price: Option<i64>,
    pub is_shippable: bool,
    pub is_notifiable: bool,
    pub is_parent_cancellable: bool,
    pub is_one_time_pairable: bool,
    pub lifecycle: Lifecycle,
}

impl Unit {
    pub fn new(id: UnitId, workflow_id: WorkflowId, step_number: i32) -> Self {
        Self {
            id,
            workflow_id,
            name: format!("Step {}", step_number),
            step_number,
            duration: None,
            product_id: None,
            price: None,
            is_shippable: true,
            is_notifiable: true,
            is_parent_cancellable: false,
            is_one_time_pairable: true,
            lifecycle: Lifecycle::Active,
        }
    }

    pub fn custom_product_id(&self) -> Option<ProductId> {
        self.product_id.filter(|id| *id > 0)
    }

    pub fn custom_duration(&self) -> Option<i32> {
        self.duration.filter(|days| *days > 0)
    }

    pub fn custom_price(&self) -> Option<i64> {
        self.price
    }

    /// Paired one-time products wait for the following cycle unless this
    /// step is allowed to carry them.
    pub fn should_delay_paired_product(&self) -> bool {
        !self.is_one_time_pairable
    }
}

/// Attachment of a workflow to an offer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowOffer {
    pub workflow_id: WorkflowId,
    pub offer_id: OfferId,
    pub is_default: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_overrides_are_not_custom() {
        let mut unit = Unit::new(1, 1, 2);
        unit.product_id = Some(0);
        unit.duration = Some(0);

        assert_eq!(unit.custom_product_id(), None);
        assert_eq!(unit.custom_duration(), None);

        unit.product_id = Some(12);
        unit.duration = Some(14);
        assert_eq!(unit.custom_product_id(), Some(12));
        assert_eq!(unit.custom_duration(), Some(14));
    }

    #[test]
    fn test_paired_product_delay_follows_pairable_flag() {
        let mut unit = Unit::new(1, 1, 1);
        assert!(!unit.should_delay_paired_product());

        unit.is_one_time_pairable = false;
        assert!(unit.should_delay_paired_product());
    }

    #[test]
    fn test_lifecycle_parse() {
        for lifecycle in [Lifecycle::Active, Lifecycle::Inactive, Lifecycle::Deleted] {
            assert_eq!(Lifecycle::parse(lifecycle.as_str()), Some(lifecycle));
        }
        assert_eq!(Lifecycle::parse("archived"), None);
    }
}
