use crate::instruction::{Instruction, InstructionContext, OptimisticSnapshot};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use taskcore_types::{EntityId, EntityKind, HttpMethod, InstructionError, OutboundRequest, Record, ResourceKey, Task};

fn parse<T: DeserializeOwned>(payload: &Value) -> Result<T, InstructionError> {
    serde_json::from_value(payload.clone()).map_err(|e| InstructionError::Validation(e.to_string()))
}

fn task_resource_key(id: EntityId) -> ResourceKey {
    ResourceKey::new(format!("task:{id}"))
}

/// Resource keys are best-effort against a payload that hasn't been
/// validated yet (§4.F SCH runs before EX's `validate`): a malformed
/// payload yields no keys, so the instruction gets no hazard protection
/// but still fails promptly in `validate`.
fn resource_keys_for_id(payload: &Value) -> Vec<ResourceKey> {
    #[derive(Deserialize)]
    struct WithId {
        id: EntityId,
    }
    match parse::<WithId>(payload) {
        Ok(w) => vec![task_resource_key(w.id)],
        Err(_) => Vec::new(),
    }
}

#[derive(Deserialize)]
struct CreatePayload {
    id: EntityId,
    title: String,
    #[serde(default)]
    area_id: Option<EntityId>,
    #[serde(default)]
    project_id: Option<EntityId>,
    #[serde(default)]
    section_id: Option<EntityId>,
    #[serde(default)]
    due_date: Option<NaiveDate>,
    #[serde(default)]
    scheduled_date: Option<NaiveDate>,
}

pub struct TaskCreate;

#[async_trait]
impl Instruction for TaskCreate {
    fn resource_keys(&self, payload: &Value) -> Vec<ResourceKey> {
        resource_keys_for_id(payload)
    }

    fn validate(&self, payload: &Value) -> Result<(), InstructionError> {
        let p: CreatePayload = parse(payload)?;
        if p.title.trim().is_empty() {
            return Err(InstructionError::Validation("title must not be empty".to_string()));
        }
        Ok(())
    }

    fn optimistic_apply(&self, payload: &Value, ctx: &InstructionContext) -> OptimisticSnapshot {
        let mut snapshot = OptimisticSnapshot::new();
        let p: CreatePayload = match parse(payload) {
            Ok(p) => p,
            Err(_) => return snapshot,
        };
        let prior = ctx.store.get(EntityKind::Task, p.id);
        let task = Task {
            id: p.id,
            title: p.title,
            is_completed: false,
            archived: false,
            deleted: false,
            due_date: p.due_date,
            scheduled_date: p.scheduled_date,
            area_id: p.area_id,
            project_id: p.project_id,
            section_id: p.section_id,
            recurrence_id: None,
            recurrence_original_date: None,
        };
        ctx.store.add_or_update(EntityKind::Task, Record::Task(task));
        snapshot.push(EntityKind::Task, p.id, prior);
        snapshot
    }

    fn request(&self, payload: &Value, ctx: &InstructionContext) -> Option<OutboundRequest> {
        Some(
            OutboundRequest::new(HttpMethod::Post, "/tasks")
                .with_body(payload.clone())
                .with_correlation_id(ctx.correlation_id.clone()),
        )
    }
}

#[derive(Deserialize)]
struct UpdatePayload {
    id: EntityId,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    due_date: Option<NaiveDate>,
    #[serde(default)]
    scheduled_date: Option<NaiveDate>,
    #[serde(default)]
    area_id: Option<EntityId>,
    #[serde(default)]
    project_id: Option<EntityId>,
    #[serde(default)]
    section_id: Option<EntityId>,
}

pub struct TaskUpdate;

#[async_trait]
impl Instruction for TaskUpdate {
    fn resource_keys(&self, payload: &Value) -> Vec<ResourceKey> {
        resource_keys_for_id(payload)
    }

    fn validate(&self, payload: &Value) -> Result<(), InstructionError> {
        parse::<UpdatePayload>(payload).map(|_| ())
    }

    fn optimistic_apply(&self, payload: &Value, ctx: &InstructionContext) -> OptimisticSnapshot {
        let mut snapshot = OptimisticSnapshot::new();
        let p: UpdatePayload = match parse(payload) {
            Ok(p) => p,
            Err(_) => return snapshot,
        };
        let Some(Record::Task(mut task)) = ctx.store.get(EntityKind::Task, p.id) else {
            // Nothing locally to update; the server remains the source of
            // truth and will correct the store via its response envelope.
            return snapshot;
        };
        let prior = Some(Record::Task(task.clone()));
        if let Some(title) = p.title {
            task.title = title;
        }
        if p.due_date.is_some() {
            task.due_date = p.due_date;
        }
        if p.scheduled_date.is_some() {
            task.scheduled_date = p.scheduled_date;
        }
        if p.area_id.is_some() {
            task.area_id = p.area_id;
        }
        if p.project_id.is_some() {
            task.project_id = p.project_id;
        }
        if p.section_id.is_some() {
            task.section_id = p.section_id;
        }
        ctx.store.add_or_update(EntityKind::Task, Record::Task(task));
        snapshot.push(EntityKind::Task, p.id, prior);
        snapshot
    }

    fn request(&self, payload: &Value, ctx: &InstructionContext) -> Option<OutboundRequest> {
        let id: EntityId = parse::<IdOnly>(payload).ok()?.id;
        Some(
            OutboundRequest::new(HttpMethod::Patch, format!("/tasks/{id}"))
                .with_body(payload.clone())
                .with_correlation_id(ctx.correlation_id.clone()),
        )
    }
}

#[derive(Deserialize)]
struct IdOnly {
    id: EntityId,
}

fn toggle_completion(instruction_name: &str, complete: bool, payload: &Value, ctx: &InstructionContext) -> OptimisticSnapshot {
    let mut snapshot = OptimisticSnapshot::new();
    let p: IdOnly = match parse(payload) {
        Ok(p) => p,
        Err(_) => return snapshot,
    };
    let Some(Record::Task(mut task)) = ctx.store.get(EntityKind::Task, p.id) else {
        tracing::debug!(instruction = %instruction_name, id = %p.id, "task not found locally, skipping optimistic toggle");
        return snapshot;
    };
    let prior = Some(Record::Task(task.clone()));
    task.is_completed = complete;
    ctx.store.add_or_update(EntityKind::Task, Record::Task(task));
    snapshot.push(EntityKind::Task, p.id, prior);
    snapshot
}

pub struct TaskComplete;

#[async_trait]
impl Instruction for TaskComplete {
    fn resource_keys(&self, payload: &Value) -> Vec<ResourceKey> {
        resource_keys_for_id(payload)
    }

    fn validate(&self, payload: &Value) -> Result<(), InstructionError> {
        parse::<IdOnly>(payload).map(|_| ())
    }

    fn optimistic_apply(&self, payload: &Value, ctx: &InstructionContext) -> OptimisticSnapshot {
        toggle_completion("task.complete", true, payload, ctx)
    }

    fn request(&self, payload: &Value, ctx: &InstructionContext) -> Option<OutboundRequest> {
        let id = parse::<IdOnly>(payload).ok()?.id;
        Some(OutboundRequest::new(HttpMethod::Post, format!("/tasks/{id}/complete")).with_correlation_id(ctx.correlation_id.clone()))
    }
}

pub struct TaskReopen;

#[async_trait]
impl Instruction for TaskReopen {
    fn resource_keys(&self, payload: &Value) -> Vec<ResourceKey> {
        resource_keys_for_id(payload)
    }

    fn validate(&self, payload: &Value) -> Result<(), InstructionError> {
        parse::<IdOnly>(payload).map(|_| ())
    }

    fn optimistic_apply(&self, payload: &Value, ctx: &InstructionContext) -> OptimisticSnapshot {
        toggle_completion("task.reopen", false, payload, ctx)
    }

    fn request(&self, payload: &Value, ctx: &InstructionContext) -> Option<OutboundRequest> {
        let id = parse::<IdOnly>(payload).ok()?.id;
        Some(OutboundRequest::new(HttpMethod::Post, format!("/tasks/{id}/reopen")).with_correlation_id(ctx.correlation_id.clone()))
    }
}

pub struct TaskDelete;

#[async_trait]
impl Instruction for TaskDelete {
    fn resource_keys(&self, payload: &Value) -> Vec<ResourceKey> {
        resource_keys_for_id(payload)
    }

    fn validate(&self, payload: &Value) -> Result<(), InstructionError> {
        parse::<IdOnly>(payload).map(|_| ())
    }

    fn optimistic_apply(&self, payload: &Value, ctx: &InstructionContext) -> OptimisticSnapshot {
        let mut snapshot = OptimisticSnapshot::new();
        let p: IdOnly = match parse(payload) {
            Ok(p) => p,
            Err(_) => return snapshot,
        };
        let Some(Record::Task(mut task)) = ctx.store.get(EntityKind::Task, p.id) else {
            return snapshot;
        };
        let prior = Some(Record::Task(task.clone()));
        // I2: soft-delete is monotonic; never revive within the same run.
        task.deleted = true;
        ctx.store.add_or_update(EntityKind::Task, Record::Task(task));
        snapshot.push(EntityKind::Task, p.id, prior);
        snapshot
    }

    fn request(&self, payload: &Value, ctx: &InstructionContext) -> Option<OutboundRequest> {
        let id = parse::<IdOnly>(payload).ok()?.id;
        Some(OutboundRequest::new(HttpMethod::Delete, format!("/tasks/{id}")).with_correlation_id(ctx.correlation_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use taskcore_store::EntityStore;
    use taskcore_types::CorrelationId;

    fn ctx(store: &EntityStore) -> InstructionContext<'_> {
        InstructionContext {
            store,
            correlation_id: CorrelationId::allocate(),
        }
    }

    #[test]
    fn create_then_complete_round_trips() {
        let store = EntityStore::new();
        let id = EntityId::new();
        let payload = json!({ "id": id.to_string(), "title": "Write tests" });

        let create = TaskCreate;
        create.validate(&payload).unwrap();
        let snapshot = create.optimistic_apply(&payload, &ctx(&store));
        assert_eq!(store.get(EntityKind::Task, id).unwrap().as_task().unwrap().title, "Write tests");
        assert_eq!(snapshot.0.len(), 1);
        assert!(snapshot.0[0].prior.is_none());

        let complete = TaskComplete;
        let complete_payload = json!({ "id": id.to_string() });
        complete.optimistic_apply(&complete_payload, &ctx(&store));
        assert!(store.get(EntityKind::Task, id).unwrap().as_task().unwrap().is_completed);
    }

    #[test]
    fn revert_restores_prior_title() {
        let store = EntityStore::new();
        let id = EntityId::new();
        TaskCreate.optimistic_apply(&json!({ "id": id.to_string(), "title": "Original" }), &ctx(&store));

        let update = TaskUpdate;
        let c = ctx(&store);
        let snapshot = update.optimistic_apply(&json!({ "id": id.to_string(), "title": "Changed" }), &c);
        assert_eq!(store.get(EntityKind::Task, id).unwrap().as_task().unwrap().title, "Changed");

        update.optimistic_revert(&snapshot, &c);
        assert_eq!(store.get(EntityKind::Task, id).unwrap().as_task().unwrap().title, "Original");
    }

    #[test]
    fn empty_title_fails_validation() {
        let payload = json!({ "id": EntityId::new().to_string(), "title": "  " });
        assert!(TaskCreate.validate(&payload).is_err());
    }

    // P4: reverting a failed instruction's optimistic snapshot restores the
    // store to exactly its pre-apply state, for any title pair.
    proptest::proptest! {
        #[test]
        fn update_then_revert_restores_the_original_task(
            original in "[a-zA-Z0-9 ]{1,20}",
            changed in "[a-zA-Z0-9 ]{1,20}",
        ) {
            let store = EntityStore::new();
            let id = EntityId::new();
            TaskCreate.optimistic_apply(&json!({ "id": id.to_string(), "title": original }), &ctx(&store));
            let before = store.get(EntityKind::Task, id).unwrap();

            let update = TaskUpdate;
            let c = ctx(&store);
            let snapshot = update.optimistic_apply(&json!({ "id": id.to_string(), "title": changed }), &c);
            update.optimistic_revert(&snapshot, &c);

            let after = store.get(EntityKind::Task, id).unwrap();
            proptest::prop_assert_eq!(before, after);
        }
    }
}
