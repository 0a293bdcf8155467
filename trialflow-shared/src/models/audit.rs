use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ActorId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuditEntity {
    Workflow,
    Unit,
}

impl AuditEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEntity::Workflow => "workflow",
            AuditEntity::Unit => "unit",
        }
    }
}

impl std::fmt::Display for AuditEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only record of one configuration field change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditRecord {
    pub id: Uuid,
    pub entity: AuditEntity,
    pub entity_id: i64,
    pub field: String,
    pub field_label: String,
    pub previous_value: String,
    pub new_value: String,
    pub actor_id: ActorId,
    pub created_at: DateTime<Utc>,
}
