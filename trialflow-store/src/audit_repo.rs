use async_trait::async_trait;
use sqlx::PgPool;
use trialflow_core::{AuditRepository, StoreResult};
use trialflow_shared::AuditRecord;

use crate::store_error;

/// Append-only; `audit_records` rejects updates and deletes at the database.
pub struct StoreAuditRepository {
    pool: PgPool,
}

impl StoreAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for StoreAuditRepository {
    async fn insert_audit_record(&self, record: &AuditRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_records (id, entity, entity_id, field, field_label, previous_value, new_value, actor_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id)
        .bind(record.entity.as_str())
        .bind(record.entity_id)
        .bind(&record.field)
        .bind(&record.field_label)
        .bind(&record.previous_value)
        .bind(&record.new_value)
        .bind(record.actor_id)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(())
    }
}
