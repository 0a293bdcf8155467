use serde_json::{json, Value};
use tracing::warn;
use trialflow_core::{Repositories, WorkflowError};
use trialflow_shared::{OfferId, OrderId, OrderType, WorkflowId};
use trialflow_workflow::{
    DeclineManagerHandler, InitialHandler, MainOrderHandler, NotificationHandler, RebillHandler,
    ShippableOrderFilter,
};

/// Configuration errors mean standard subscription behaviour applies.
fn fallback(err: WorkflowError) -> anyhow::Result<Value> {
    if err.is_configuration() {
        warn!("Falling back to standard billing: {}", err);
        return Ok(json!({ "workflow_controlled": false, "reason": err.to_string() }));
    }
    Err(err.into())
}

pub async fn initial(
    repos: &Repositories,
    offer_id: OfferId,
    workflow_id: Option<WorkflowId>,
) -> anyhow::Result<Value> {
    let handler = match InitialHandler::load(repos, offer_id, workflow_id).await {
        Ok(handler) => handler,
        Err(err) => return fallback(err),
    };

    Ok(json!({
        "workflow_controlled": true,
        "workflow": handler.workflow(),
        "is_default": handler.relation().is_default,
        "current": handler.current(),
        "next": handler.next(),
        "initial_cycle_depth": handler.initial_cycle_depth(),
    }))
}

pub async fn rebill(
    repos: &Repositories,
    order_id: OrderId,
    order_type: OrderType,
) -> anyhow::Result<Value> {
    let handler = match RebillHandler::load(repos, order_id, order_type).await {
        Ok(handler) => handler,
        Err(err) => return fallback(err),
    };

    let overrides = handler.process_recurring_values();
    Ok(json!({
        "workflow_controlled": handler.can_process_recurring_values(),
        "line_item": handler.line_item(),
        "position": handler.position(),
        "exhausted": handler.is_exhausted(),
        "overrides": overrides,
    }))
}

pub async fn chain(repos: &Repositories, main_order_id: OrderId) -> anyhow::Result<Value> {
    let positions = match MainOrderHandler::load(repos, main_order_id).await {
        Ok(positions) => positions,
        Err(err) => return fallback(err),
    };
    let shipping = ShippableOrderFilter::new(repos.chains.clone())
        .filter(main_order_id)
        .await?;

    let has_main = positions.has_main_line_item();
    let has_upsells = positions.has_upsell_line_items();
    let declines = DeclineManagerHandler::from(positions.clone());
    let notifications = NotificationHandler::from(positions);

    Ok(json!({
        "has_main_line_item": has_main,
        "has_upsell_line_items": has_upsells,
        "cancel_parent_on_max_retries": declines.should_cancel_parent_on_max_retries(),
        "suppress_order_confirmation": notifications.should_suppress_order_confirmation(),
        "shipping": shipping,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use trialflow_shared::{Unit, WorkflowDefinition};
    use trialflow_workflow::InMemoryStore;

    #[tokio::test]
    async fn test_unconfigured_offer_reports_fallback() {
        let repos = Repositories::from_store(Arc::new(InMemoryStore::new()));

        let output = initial(&repos, 5, None).await.unwrap();
        assert_eq!(output["workflow_controlled"], json!(false));
    }

    #[tokio::test]
    async fn test_initial_reports_cycle_depth() {
        let store = Arc::new(InMemoryStore::new());
        store.insert_workflow(WorkflowDefinition::new(1, "Trial")).await;
        store.insert_unit(Unit::new(1, 1, 1)).await;
        store.insert_unit(Unit::new(2, 1, 2)).await;
        store.attach(1, 5, true).await;
        let repos = Repositories::from_store(store);

        let output = initial(&repos, 5, None).await.unwrap();
        assert_eq!(output["workflow_controlled"], json!(true));
        assert_eq!(output["initial_cycle_depth"], json!(-3));
        assert_eq!(output["next"]["step_number"], json!(2));
    }

    #[tokio::test]
    async fn test_chain_without_line_items() {
        let repos = Repositories::from_store(Arc::new(InMemoryStore::new()));

        let output = chain(&repos, 9).await.unwrap();
        assert_eq!(output["cancel_parent_on_max_retries"], json!(false));
        assert_eq!(output["shipping"]["shippable_main_id"], json!(9));
    }
}
