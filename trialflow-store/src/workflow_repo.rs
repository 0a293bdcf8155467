use async_trait::async_trait;
use sqlx::PgPool;
use trialflow_core::{StoreResult, WorkflowRepository};
use trialflow_shared::{
    Lifecycle, OfferId, Unit, UnitId, WorkflowDefinition, WorkflowId, WorkflowOffer,
};

use crate::{decode_error, store_error};

pub struct StoreWorkflowRepository {
    pool: PgPool,
}

impl StoreWorkflowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct WorkflowRow {
    id: i64,
    name: String,
    lifecycle: String,
    created_by: Option<i64>,
    updated_by: Option<i64>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<WorkflowRow> for WorkflowDefinition {
    type Error = trialflow_core::StoreError;

    fn try_from(row: WorkflowRow) -> Result<Self, Self::Error> {
        Ok(WorkflowDefinition {
            id: row.id,
            name: row.name,
            lifecycle: parse_lifecycle(&row.lifecycle)?,
            created_by: row.created_by,
            updated_by: row.updated_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UnitRow {
    id: i64,
    workflow_id: i64,
    name: String,
    step_number: i32,
    duration: Option<i32>,
    product_id: Option<i64>,
    price: Option<i64>,
    is_shippable: bool,
    is_notifiable: bool,
    is_parent_cancellable: bool,
    is_one_time_pairable: bool,
    lifecycle: String,
}

impl TryFrom<UnitRow> for Unit {
    type Error = trialflow_core::StoreError;

    fn try_from(row: UnitRow) -> Result<Self, Self::Error> {
        Ok(Unit {
            id: row.id,
            workflow_id: row.workflow_id,
            name: row.name,
            step_number: row.step_number,
            duration: row.duration,
            product_id: row.product_id,
            price: row.price,
            is_shippable: row.is_shippable,
            is_notifiable: row.is_notifiable,
            is_parent_cancellable: row.is_parent_cancellable,
            is_one_time_pairable: row.is_one_time_pairable,
            lifecycle: parse_lifecycle(&row.lifecycle)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct WorkflowOfferRow {
    workflow_id: i64,
    offer_id: i64,
    is_default: bool,
}

fn parse_lifecycle(value: &str) -> StoreResult<Lifecycle> {
    Lifecycle::parse(value).ok_or_else(|| decode_error("lifecycle", value))
}

const UNIT_COLUMNS: &str = "id, workflow_id, name, step_number, duration, product_id, price, \
    is_shippable, is_notifiable, is_parent_cancellable, is_one_time_pairable, lifecycle";

#[async_trait]
impl WorkflowRepository for StoreWorkflowRepository {
    async fn find_workflow(&self, id: WorkflowId) -> StoreResult<Option<WorkflowDefinition>> {
        let row = sqlx::query_as::<_, WorkflowRow>(
            "SELECT id, name, lifecycle, created_by, updated_by, created_at, updated_at FROM workflows WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        row.map(WorkflowDefinition::try_from).transpose()
    }

    async fn find_workflow_offer(
        &self,
        offer_id: OfferId,
        workflow_id: Option<WorkflowId>,
    ) -> StoreResult<Option<WorkflowOffer>> {
        let row = sqlx::query_as::<_, WorkflowOfferRow>(
            r#"
            SELECT workflow_id, offer_id, is_default
            FROM workflow_offers
            WHERE offer_id = $1
              AND (($2::BIGINT IS NULL AND is_default) OR workflow_id = $2)
            ORDER BY workflow_id
            LIMIT 1
            "#,
        )
        .bind(offer_id)
        .bind(workflow_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(row.map(|r| WorkflowOffer {
            workflow_id: r.workflow_id,
            offer_id: r.offer_id,
            is_default: r.is_default,
        }))
    }

    async fn list_units(&self, workflow_id: WorkflowId) -> StoreResult<Vec<Unit>> {
        let rows = sqlx::query_as::<_, UnitRow>(&format!(
            "SELECT {} FROM workflow_units WHERE workflow_id = $1 ORDER BY step_number, id",
            UNIT_COLUMNS
        ))
        .bind(workflow_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        rows.into_iter().map(Unit::try_from).collect()
    }

    async fn find_unit(&self, id: UnitId) -> StoreResult<Option<Unit>> {
        let row = sqlx::query_as::<_, UnitRow>(&format!(
            "SELECT {} FROM workflow_units WHERE id = $1",
            UNIT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        row.map(Unit::try_from).transpose()
    }

    async fn attach_offer(&self, relation: &WorkflowOffer) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        if relation.is_default {
            sqlx::query(
                "UPDATE workflow_offers SET is_default = FALSE WHERE offer_id = $1 AND workflow_id <> $2",
            )
            .bind(relation.offer_id)
            .bind(relation.workflow_id)
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;
        }

        sqlx::query(
            r#"
            INSERT INTO workflow_offers (workflow_id, offer_id, is_default)
            VALUES ($1, $2, $3)
            ON CONFLICT (workflow_id, offer_id) DO UPDATE SET is_default = EXCLUDED.is_default
            "#,
        )
        .bind(relation.workflow_id)
        .bind(relation.offer_id)
        .bind(relation.is_default)
        .execute(&mut *tx)
        .await
        .map_err(store_error)?;

        tx.commit().await.map_err(store_error)?;
        Ok(())
    }
}
