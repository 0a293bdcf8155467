use async_trait::async_trait;
use sqlx::PgPool;
use trialflow_core::{OrderChainRepository, StoreResult};
use trialflow_shared::{ChainShipping, OrderId, OrderType};

use crate::{decode_error, store_error};

pub struct StoreOrderChainRepository {
    pool: PgPool,
}

impl StoreOrderChainRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ChainShippingRow {
    order_id: i64,
    order_type: String,
    unit_is_shippable: Option<bool>,
}

#[async_trait]
impl OrderChainRepository for StoreOrderChainRepository {
    async fn list_upsell_order_ids(&self, main_order_id: OrderId) -> StoreResult<Vec<OrderId>> {
        let ids: Vec<(i64,)> =
            sqlx::query_as("SELECT id FROM upsell_orders WHERE main_order_id = $1 ORDER BY id")
                .bind(main_order_id)
                .fetch_all(&self.pool)
                .await
                .map_err(store_error)?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn list_chain_shipping(&self, main_order_id: OrderId) -> StoreResult<Vec<ChainShipping>> {
        // the main order and its upsells, each joined to its latest line item's unit
        let rows = sqlx::query_as::<_, ChainShippingRow>(
            r#"
            WITH chain AS (
                SELECT $1::BIGINT AS order_id, 'main'::TEXT AS order_type, 0 AS chain_rank
                UNION ALL
                SELECT id, 'upsell'::TEXT, 1 FROM upsell_orders WHERE main_order_id = $1
            )
            SELECT c.order_id, c.order_type, u.is_shippable AS unit_is_shippable
            FROM chain c
            LEFT JOIN LATERAL (
                SELECT li.unit_id
                FROM line_items li
                WHERE li.order_id = c.order_id AND li.order_type = c.order_type
                ORDER BY li.created_at DESC
                LIMIT 1
            ) latest ON TRUE
            LEFT JOIN workflow_units u ON u.id = latest.unit_id
            ORDER BY c.chain_rank, c.order_id
            "#,
        )
        .bind(main_order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        rows.into_iter()
            .map(|row| {
                let order_type = OrderType::parse(&row.order_type)
                    .ok_or_else(|| decode_error("order_type", &row.order_type))?;
                Ok(ChainShipping {
                    order_id: row.order_id,
                    order_type,
                    unit_is_shippable: row.unit_is_shippable,
                })
            })
            .collect()
    }
}
