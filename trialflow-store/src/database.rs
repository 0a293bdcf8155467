use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tracing::info;
use trialflow_core::Repositories;

use crate::app_config::DatabaseConfig;
use crate::{
    StoreAuditRepository, StoreLineItemRepository, StoreOrderChainRepository,
    StoreWorkflowRepository,
};

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Repository handles over this pool for the workflow handlers.
    pub fn repositories(&self) -> Repositories {
        Repositories {
            workflows: Arc::new(StoreWorkflowRepository::new(self.pool.clone())),
            line_items: Arc::new(StoreLineItemRepository::new(self.pool.clone())),
            chains: Arc::new(StoreOrderChainRepository::new(self.pool.clone())),
            audit: Arc::new(StoreAuditRepository::new(self.pool.clone())),
        }
    }
}
