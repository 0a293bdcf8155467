use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use trialflow_core::{LineItemRepository, StoreError, StoreResult};
use trialflow_shared::{
    Journey, LineItem, OrderId, OrderType, PairedProductDelay, SubscriptionSnapshot,
};
use uuid::Uuid;

use crate::{decode_error, store_error};

pub struct StoreLineItemRepository {
    pool: PgPool,
}

impl StoreLineItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct LineItemRow {
    id: Uuid,
    journey_id: Uuid,
    order_id: i64,
    order_type: String,
    unit_id: i64,
    product_id: i64,
    variant_id: Option<i64>,
    subscription_product_id: i64,
    subscription_variant_id: Option<i64>,
    subscription_price: i64,
    subscription_quantity: i32,
    subscription_billing_model_id: i64,
    created_by: i64,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<LineItemRow> for LineItem {
    type Error = StoreError;

    fn try_from(row: LineItemRow) -> Result<Self, Self::Error> {
        let order_type = OrderType::parse(&row.order_type)
            .ok_or_else(|| decode_error("order_type", &row.order_type))?;

        Ok(LineItem {
            id: row.id,
            journey_id: row.journey_id,
            order_id: row.order_id,
            order_type,
            unit_id: row.unit_id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            subscription: SubscriptionSnapshot {
                product_id: row.subscription_product_id,
                variant_id: row.subscription_variant_id,
                price: row.subscription_price,
                quantity: row.subscription_quantity,
                billing_model_id: row.subscription_billing_model_id,
            },
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PairedProductDelayRow {
    id: Uuid,
    order_id: i64,
    line_item_id: Uuid,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[async_trait]
impl LineItemRepository for StoreLineItemRepository {
    async fn create_journey(&self, journey: &Journey) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO journeys (id, initiating_order_id, created_by, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(journey.id)
        .bind(journey.initiating_order_id)
        .bind(journey.created_by)
        .bind(journey.created_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(())
    }

    async fn find_line_item(
        &self,
        order_id: OrderId,
        order_type: OrderType,
    ) -> StoreResult<Option<LineItem>> {
        let row = sqlx::query_as::<_, LineItemRow>(
            r#"
            SELECT id, journey_id, order_id, order_type, unit_id, product_id, variant_id,
                   subscription_product_id, subscription_variant_id, subscription_price,
                   subscription_quantity, subscription_billing_model_id, created_by, created_at
            FROM line_items
            WHERE order_id = $1 AND order_type = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(order_id)
        .bind(order_type.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        row.map(LineItem::try_from).transpose()
    }

    async fn create_line_item(&self, item: &LineItem) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO line_items (
                id, journey_id, order_id, order_type, unit_id, product_id, variant_id,
                subscription_product_id, subscription_variant_id, subscription_price,
                subscription_quantity, subscription_billing_model_id, created_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(item.id)
        .bind(item.journey_id)
        .bind(item.order_id)
        .bind(item.order_type.as_str())
        .bind(item.unit_id)
        .bind(item.product_id)
        .bind(item.variant_id)
        .bind(item.subscription.product_id)
        .bind(item.subscription.variant_id)
        .bind(item.subscription.price)
        .bind(item.subscription.quantity)
        .bind(item.subscription.billing_model_id)
        .bind(item.created_by)
        .bind(item.created_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        debug!(
            "Stored line item {} for {} order {}",
            item.id, item.order_type, item.order_id
        );
        Ok(())
    }

    async fn create_paired_product_delay(&self, delay: &PairedProductDelay) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO paired_product_delays (id, order_id, line_item_id, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(delay.id)
        .bind(delay.order_id)
        .bind(delay.line_item_id)
        .bind(delay.created_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(())
    }

    async fn find_paired_product_delay(
        &self,
        order_id: OrderId,
    ) -> StoreResult<Option<PairedProductDelay>> {
        let row = sqlx::query_as::<_, PairedProductDelayRow>(
            "SELECT id, order_id, line_item_id, created_at FROM paired_product_delays WHERE order_id = $1 ORDER BY created_at LIMIT 1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(row.map(|r| PairedProductDelay {
            id: r.id,
            order_id: r.order_id,
            line_item_id: r.line_item_id,
            created_at: r.created_at,
        }))
    }

    async fn clear_paired_product_delay(&self, order_id: OrderId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM paired_product_delays WHERE order_id = $1")
            .bind(order_id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(result.rows_affected() > 0)
    }
}
