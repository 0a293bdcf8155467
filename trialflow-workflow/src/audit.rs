use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{info, warn};
use trialflow_core::{ActorContext, AuditRepository, WorkflowError, WorkflowResult};
use trialflow_shared::{AuditEntity, AuditRecord, Lifecycle, Unit, WorkflowDefinition};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Flag,
    Number,
    OptionalNumber { zero_is_none: bool },
    Text,
}

#[derive(Debug, Clone, Copy)]
pub struct TrackedField {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, label: &'static str, kind: FieldKind) -> TrackedField {
    TrackedField { name, label, kind }
}

const WORKFLOW_FIELDS: &[TrackedField] = &[
    field("name", "Name", FieldKind::Text),
    field("is_active", "Active", FieldKind::Flag),
];

const UNIT_FIELDS: &[TrackedField] = &[
    field("name", "Name", FieldKind::Text),
    field("step_number", "Step Number", FieldKind::Number),
    field("duration", "Duration", FieldKind::OptionalNumber { zero_is_none: true }),
    field("product_id", "Product", FieldKind::OptionalNumber { zero_is_none: true }),
    field("price", "Price", FieldKind::OptionalNumber { zero_is_none: false }),
    field("is_shippable", "Shippable", FieldKind::Flag),
    field("is_notifiable", "Notifiable", FieldKind::Flag),
    field("is_parent_cancellable", "Parent Cancellable", FieldKind::Flag),
    field("is_one_time_pairable", "One Time Pairable", FieldKind::Flag),
    field("is_active", "Active", FieldKind::Flag),
];

/// Comparable value of a tracked field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Flag(bool),
    Number(Option<i64>),
    Text(String),
}

impl FieldValue {
    /// Text written to the audit trail. Flags read Yes/No.
    pub fn render(&self) -> String {
        match self {
            FieldValue::Flag(true) => "Yes".to_string(),
            FieldValue::Flag(false) => "No".to_string(),
            FieldValue::Number(Some(n)) => n.to_string(),
            FieldValue::Number(None) => String::new(),
            FieldValue::Text(text) => text.clone(),
        }
    }

    fn read(kind: FieldKind, value: &Value) -> Option<Self> {
        match kind {
            FieldKind::Flag => read_flag(value).map(FieldValue::Flag),
            FieldKind::Number => read_number(value).map(|n| FieldValue::Number(Some(n))),
            FieldKind::OptionalNumber { zero_is_none } => {
                let number = match value {
                    Value::Null => None,
                    Value::String(s) if s.trim().is_empty() => None,
                    other => Some(read_number(other)?),
                };
                let number = number.filter(|n| !(zero_is_none && *n == 0));
                Some(FieldValue::Number(number))
            }
            FieldKind::Text => match value {
                Value::String(s) => Some(FieldValue::Text(s.clone())),
                Value::Number(n) => Some(FieldValue::Text(n.to_string())),
                Value::Null => Some(FieldValue::Text(String::new())),
                _ => None,
            },
        }
    }
}

fn read_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn read_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A configuration entity whose edits are audited
pub trait Auditable {
    const ENTITY: AuditEntity;

    fn audit_id(&self) -> i64;

    fn tracked_fields() -> &'static [TrackedField];

    fn field_value(&self, field: &str) -> Option<FieldValue>;
}

impl Auditable for WorkflowDefinition {
    const ENTITY: AuditEntity = AuditEntity::Workflow;

    fn audit_id(&self) -> i64 {
        self.id
    }

    fn tracked_fields() -> &'static [TrackedField] {
        WORKFLOW_FIELDS
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "name" => Some(FieldValue::Text(self.name.clone())),
            "is_active" => Some(FieldValue::Flag(self.lifecycle == Lifecycle::Active)),
            _ => None,
        }
    }
}

impl Auditable for Unit {
    const ENTITY: AuditEntity = AuditEntity::Unit;

    fn audit_id(&self) -> i64 {
        self.id
    }

    fn tracked_fields() -> &'static [TrackedField] {
        UNIT_FIELDS
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        let value = match field {
            "name" => FieldValue::Text(self.name.clone()),
            "step_number" => FieldValue::Number(Some(self.step_number.into())),
            "duration" => FieldValue::Number(self.custom_duration().map(i64::from)),
            "product_id" => FieldValue::Number(self.custom_product_id()),
            "price" => FieldValue::Number(self.price),
            "is_shippable" => FieldValue::Flag(self.is_shippable),
            "is_notifiable" => FieldValue::Flag(self.is_notifiable),
            "is_parent_cancellable" => FieldValue::Flag(self.is_parent_cancellable),
            "is_one_time_pairable" => FieldValue::Flag(self.is_one_time_pairable),
            "is_active" => FieldValue::Flag(self.lifecycle == Lifecycle::Active),
            _ => return None,
        };
        Some(value)
    }
}

/// One field change waiting to be committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedChange {
    pub entity_id: i64,
    pub field: String,
    pub field_label: String,
    pub previous_value: String,
    pub new_value: String,
}

/// Compares an existing workflow or unit against the values an admin proposes
/// and stages one record per changed field. Committing writes the records one
/// by one; a failed write stops the commit and leaves the remaining records
/// staged.
pub struct AuditStage<'a, T: Auditable> {
    instance: &'a T,
    staged: Vec<StagedChange>,
}

pub type WorkflowAuditStage<'a> = AuditStage<'a, WorkflowDefinition>;
pub type UnitAuditStage<'a> = AuditStage<'a, Unit>;

impl<'a, T: Auditable> AuditStage<'a, T> {
    pub fn new(instance: &'a T) -> Self {
        Self {
            instance,
            staged: Vec::new(),
        }
    }

    pub fn staged(&self) -> &[StagedChange] {
        &self.staged
    }

    /// Stage a record for every tracked field whose proposed value differs
    /// from the instance. Keys that are not tracked are ignored. An unreadable
    /// value rejects the whole proposal and stages nothing. Returns the number
    /// of records staged by this call.
    pub fn stage_changes(&mut self, proposed: &Map<String, Value>) -> WorkflowResult<usize> {
        let mut changes = Vec::new();

        for tracked in T::tracked_fields() {
            let Some(raw) = proposed.get(tracked.name) else {
                continue;
            };
            let proposed_value =
                FieldValue::read(tracked.kind, raw).ok_or_else(|| WorkflowError::InvalidFieldValue {
                    field: tracked.name.to_string(),
                    value: raw.to_string(),
                })?;
            let Some(current) = self.instance.field_value(tracked.name) else {
                continue;
            };
            if current == proposed_value {
                continue;
            }

            changes.push(StagedChange {
                entity_id: self.instance.audit_id(),
                field: tracked.name.to_string(),
                field_label: tracked.label.to_string(),
                previous_value: current.render(),
                new_value: proposed_value.render(),
            });
        }

        let count = changes.len();
        self.staged.extend(changes);
        Ok(count)
    }

    /// Write every staged record. Stops at the first failed insert; records
    /// written before it stay written and are no longer staged.
    pub async fn commit_changes(
        &mut self,
        audit: &dyn AuditRepository,
        actor: &ActorContext,
    ) -> WorkflowResult<Vec<AuditRecord>> {
        let mut committed = Vec::with_capacity(self.staged.len());
        let mut failure = None;

        for change in &self.staged {
            let record = AuditRecord {
                id: Uuid::new_v4(),
                entity: T::ENTITY,
                entity_id: change.entity_id,
                field: change.field.clone(),
                field_label: change.field_label.clone(),
                previous_value: change.previous_value.clone(),
                new_value: change.new_value.clone(),
                actor_id: actor.actor_id,
                created_at: Utc::now(),
            };

            match audit.insert_audit_record(&record).await {
                Ok(()) => committed.push(record),
                Err(source) => {
                    failure = Some(WorkflowError::AuditCreate {
                        entity: T::ENTITY,
                        entity_id: change.entity_id,
                        field: change.field.clone(),
                        source,
                    });
                    break;
                }
            }
        }

        self.staged.drain(..committed.len());

        if let Some(err) = failure {
            warn!("{}", err);
            return Err(err);
        }

        info!(
            "Recorded {} change(s) to {} {} by {}",
            committed.len(),
            T::ENTITY,
            self.instance.audit_id(),
            actor.display_name
        );
        Ok(committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use serde_json::json;

    fn proposed(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_deactivating_workflow_stages_yes_no() {
        let workflow = WorkflowDefinition::new(3, "Trial");
        let mut stage = WorkflowAuditStage::new(&workflow);

        let count = stage.stage_changes(&proposed(json!({"is_active": false}))).unwrap();

        assert_eq!(count, 1);
        let change = &stage.staged()[0];
        assert_eq!(change.entity_id, 3);
        assert_eq!(change.field, "is_active");
        assert_eq!(change.field_label, "Active");
        assert_eq!(change.previous_value, "Yes");
        assert_eq!(change.new_value, "No");
    }

    #[test]
    fn test_unchanged_value_stages_nothing() {
        let workflow = WorkflowDefinition::new(3, "Trial");
        let mut stage = WorkflowAuditStage::new(&workflow);

        let count = stage
            .stage_changes(&proposed(json!({"is_active": true, "name": "Trial"})))
            .unwrap();

        assert_eq!(count, 0);
        assert!(stage.staged().is_empty());
    }

    #[test]
    fn test_unit_changes_in_field_order() {
        let mut unit = Unit::new(8, 1, 2);
        unit.duration = Some(14);
        let mut stage = UnitAuditStage::new(&unit);

        let count = stage
            .stage_changes(&proposed(json!({
                "is_shippable": "0",
                "duration": "30",
                "product_id": 0,
                "color": "blue",
            })))
            .unwrap();

        assert_eq!(count, 2);
        let fields: Vec<_> = stage.staged().iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["duration", "is_shippable"]);
        assert_eq!(stage.staged()[0].previous_value, "14");
        assert_eq!(stage.staged()[0].new_value, "30");
        assert_eq!(stage.staged()[1].new_value, "No");
    }

    #[test]
    fn test_unreadable_value() {
        let unit = Unit::new(8, 1, 2);
        let mut stage = UnitAuditStage::new(&unit);

        let result = stage.stage_changes(&proposed(json!({"step_number": "third"})));
        assert!(matches!(
            result,
            Err(WorkflowError::InvalidFieldValue { ref field, .. }) if field == "step_number"
        ));
    }

    #[test]
    fn test_rejected_proposal_stages_nothing() {
        let unit = Unit::new(8, 1, 2);
        let mut stage = UnitAuditStage::new(&unit);
        stage.stage_changes(&proposed(json!({"is_notifiable": false}))).unwrap();

        let result = stage.stage_changes(&proposed(json!({"name": "Intro", "is_shippable": "maybe"})));

        assert!(matches!(
            result,
            Err(WorkflowError::InvalidFieldValue { ref field, .. }) if field == "is_shippable"
        ));
        let fields: Vec<_> = stage.staged().iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["is_notifiable"]);
    }

    #[test]
    fn test_rejected_first_proposal_leaves_stage_empty() {
        let unit = Unit::new(8, 1, 2);
        let mut stage = UnitAuditStage::new(&unit);

        let result = stage.stage_changes(&proposed(json!({"name": "Intro", "is_shippable": "maybe"})));

        assert!(result.is_err());
        assert!(stage.staged().is_empty());
    }

    #[tokio::test]
    async fn test_commit_stamps_actor() {
        let store = InMemoryStore::new();
        let workflow = WorkflowDefinition::new(3, "Trial");
        let mut stage = WorkflowAuditStage::new(&workflow);
        stage
            .stage_changes(&proposed(json!({"name": "Trial v2", "is_active": false})))
            .unwrap();

        let actor = ActorContext::new(42, "ops");
        let records = stage.commit_changes(&store, &actor).await.unwrap();

        assert_eq!(records.len(), 2);
        assert!(stage.staged().is_empty());
        let stored = store.audit_records().await;
        assert_eq!(stored, records);
        assert!(stored.iter().all(|r| r.actor_id == 42 && r.entity == AuditEntity::Workflow));
    }

    #[tokio::test]
    async fn test_commit_failure_keeps_earlier_records() {
        let store = InMemoryStore::new();
        store.limit_audit_inserts(1).await;
        let unit = Unit::new(8, 1, 2);
        let mut stage = UnitAuditStage::new(&unit);
        stage
            .stage_changes(&proposed(json!({"name": "Intro", "is_notifiable": false})))
            .unwrap();

        let result = stage.commit_changes(&store, &ActorContext::system()).await;

        assert!(matches!(
            result,
            Err(WorkflowError::AuditCreate { entity: AuditEntity::Unit, entity_id: 8, ref field, .. })
                if field == "is_notifiable"
        ));
        assert_eq!(store.audit_records().await.len(), 1);
        assert_eq!(stage.staged().len(), 1);
        assert_eq!(stage.staged()[0].field, "is_notifiable");
    }
}
