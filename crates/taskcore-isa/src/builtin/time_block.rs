use crate::instruction::{Instruction, InstructionContext, OptimisticSnapshot};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use taskcore_types::{EntityId, EntityKind, HttpMethod, InstructionError, OutboundRequest, Record, ResourceKey, TimeBlock};

fn parse<T: serde::de::DeserializeOwned>(payload: &Value) -> Result<T, InstructionError> {
    serde_json::from_value(payload.clone()).map_err(|e| InstructionError::Validation(e.to_string()))
}

#[derive(Deserialize)]
struct CreateFromTaskPayload {
    id: EntityId,
    task_id: EntityId,
    date: NaiveDate,
    start_minute: u32,
    duration_minutes: u32,
}

/// Carves out a calendar block for a task. Touches both the new time
/// block's own record and the task it links, so a concurrent
/// `task.delete` can't race a block being created against it.
pub struct TimeBlockCreateFromTask;

#[async_trait]
impl Instruction for TimeBlockCreateFromTask {
    fn resource_keys(&self, payload: &Value) -> Vec<ResourceKey> {
        match parse::<CreateFromTaskPayload>(payload) {
            Ok(p) => vec![
                ResourceKey::new(format!("time_block:{}", p.id)),
                ResourceKey::new(format!("task:{}", p.task_id)),
            ],
            Err(_) => Vec::new(),
        }
    }

    fn validate(&self, payload: &Value) -> Result<(), InstructionError> {
        let p: CreateFromTaskPayload = parse(payload)?;
        if p.duration_minutes == 0 {
            return Err(InstructionError::Validation("duration_minutes must be positive".to_string()));
        }
        Ok(())
    }

    fn optimistic_apply(&self, payload: &Value, ctx: &InstructionContext) -> OptimisticSnapshot {
        let mut snapshot = OptimisticSnapshot::new();
        let p: CreateFromTaskPayload = match parse(payload) {
            Ok(p) => p,
            Err(_) => return snapshot,
        };
        let prior = ctx.store.get(EntityKind::TimeBlock, p.id);
        let block = TimeBlock {
            id: p.id,
            task_id: Some(p.task_id),
            date: p.date,
            start_minute: p.start_minute,
            duration_minutes: p.duration_minutes,
            deleted: false,
        };
        ctx.store.add_or_update(EntityKind::TimeBlock, Record::TimeBlock(block));
        snapshot.push(EntityKind::TimeBlock, p.id, prior);
        snapshot
    }

    fn request(&self, payload: &Value, ctx: &InstructionContext) -> Option<OutboundRequest> {
        Some(
            OutboundRequest::new(HttpMethod::Post, "/time-blocks")
                .with_body(payload.clone())
                .with_correlation_id(ctx.correlation_id.clone()),
        )
    }
}
