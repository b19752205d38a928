use crate::instruction::{Instruction, InstructionContext, OptimisticSnapshot};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use taskcore_types::{EntityId, EntityKind, HttpMethod, InstructionError, OutboundRequest, Record, ResourceKey};

/// Scheduling a task mutates the Task record itself (`scheduled_date`), so
/// its resource key is the owning task's, the same key `task.*`
/// instructions use — a schedule change and a concurrent task edit are
/// genuinely contending for the same record.
fn task_resource_key(id: EntityId) -> ResourceKey {
    ResourceKey::new(format!("task:{id}"))
}

fn parse<T: serde::de::DeserializeOwned>(payload: &Value) -> Result<T, InstructionError> {
    serde_json::from_value(payload.clone()).map_err(|e| InstructionError::Validation(e.to_string()))
}

#[derive(Deserialize)]
struct SchedulePayload {
    task_id: EntityId,
    date: NaiveDate,
}

pub struct ScheduleCreate;

#[async_trait]
impl Instruction for ScheduleCreate {
    fn resource_keys(&self, payload: &Value) -> Vec<ResourceKey> {
        match parse::<SchedulePayload>(payload) {
            Ok(p) => vec![task_resource_key(p.task_id)],
            Err(_) => Vec::new(),
        }
    }

    fn validate(&self, payload: &Value) -> Result<(), InstructionError> {
        parse::<SchedulePayload>(payload).map(|_| ())
    }

    fn optimistic_apply(&self, payload: &Value, ctx: &InstructionContext) -> OptimisticSnapshot {
        let mut snapshot = OptimisticSnapshot::new();
        let p: SchedulePayload = match parse(payload) {
            Ok(p) => p,
            Err(_) => return snapshot,
        };
        let Some(Record::Task(mut task)) = ctx.store.get(EntityKind::Task, p.task_id) else {
            return snapshot;
        };
        let prior = Some(Record::Task(task.clone()));
        task.scheduled_date = Some(p.date);
        ctx.store.add_or_update(EntityKind::Task, Record::Task(task));
        snapshot.push(EntityKind::Task, p.task_id, prior);
        snapshot
    }

    fn request(&self, payload: &Value, ctx: &InstructionContext) -> Option<OutboundRequest> {
        let p: SchedulePayload = parse(payload).ok()?;
        Some(
            OutboundRequest::new(HttpMethod::Post, format!("/tasks/{}/schedule", p.task_id))
                .with_body(payload.clone())
                .with_correlation_id(ctx.correlation_id.clone()),
        )
    }
}

#[derive(Deserialize)]
struct UnschedulePayload {
    task_id: EntityId,
}

pub struct ScheduleDelete;

#[async_trait]
impl Instruction for ScheduleDelete {
    fn resource_keys(&self, payload: &Value) -> Vec<ResourceKey> {
        match parse::<UnschedulePayload>(payload) {
            Ok(p) => vec![task_resource_key(p.task_id)],
            Err(_) => Vec::new(),
        }
    }

    fn validate(&self, payload: &Value) -> Result<(), InstructionError> {
        parse::<UnschedulePayload>(payload).map(|_| ())
    }

    fn optimistic_apply(&self, payload: &Value, ctx: &InstructionContext) -> OptimisticSnapshot {
        let mut snapshot = OptimisticSnapshot::new();
        let p: UnschedulePayload = match parse(payload) {
            Ok(p) => p,
            Err(_) => return snapshot,
        };
        let Some(Record::Task(mut task)) = ctx.store.get(EntityKind::Task, p.task_id) else {
            return snapshot;
        };
        let prior = Some(Record::Task(task.clone()));
        task.scheduled_date = None;
        ctx.store.add_or_update(EntityKind::Task, Record::Task(task));
        snapshot.push(EntityKind::Task, p.task_id, prior);
        snapshot
    }

    fn request(&self, payload: &Value, ctx: &InstructionContext) -> Option<OutboundRequest> {
        let p: UnschedulePayload = parse(payload).ok()?;
        Some(
            OutboundRequest::new(HttpMethod::Delete, format!("/tasks/{}/schedule", p.task_id))
                .with_correlation_id(ctx.correlation_id.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use taskcore_store::EntityStore;
    use taskcore_types::{CorrelationId, Task};

    fn ctx(store: &EntityStore) -> InstructionContext<'_> {
        InstructionContext {
            store,
            correlation_id: CorrelationId::allocate(),
        }
    }

    fn seed_task(store: &EntityStore, id: EntityId) {
        store.add_or_update(
            EntityKind::Task,
            Record::Task(Task {
                id,
                title: "t".to_string(),
                is_completed: false,
                archived: false,
                deleted: false,
                due_date: None,
                scheduled_date: None,
                area_id: None,
                project_id: None,
                section_id: None,
                recurrence_id: None,
                recurrence_original_date: None,
            }),
        );
    }

    #[test]
    fn create_then_delete_clears_scheduled_date() {
        let store = EntityStore::new();
        let task_id = EntityId::new();
        seed_task(&store, task_id);

        let create = ScheduleCreate;
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        create.optimistic_apply(&json!({ "task_id": task_id.to_string(), "date": date }), &ctx(&store));
        assert_eq!(
            store.get(EntityKind::Task, task_id).unwrap().as_task().unwrap().scheduled_date,
            Some(date)
        );

        let delete = ScheduleDelete;
        delete.optimistic_apply(&json!({ "task_id": task_id.to_string() }), &ctx(&store));
        assert!(store.get(EntityKind::Task, task_id).unwrap().as_task().unwrap().scheduled_date.is_none());
    }
}
