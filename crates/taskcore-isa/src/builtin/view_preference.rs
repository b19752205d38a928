use crate::instruction::{Instruction, InstructionContext, OptimisticSnapshot};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use taskcore_types::{EntityId, EntityKind, HttpMethod, InstructionError, OutboundRequest, Record, ResourceKey, ViewPreference};

fn parse<T: serde::de::DeserializeOwned>(payload: &Value) -> Result<T, InstructionError> {
    serde_json::from_value(payload.clone()).map_err(|e| InstructionError::Validation(e.to_string()))
}

#[derive(Deserialize)]
struct ApplySortingPayload {
    view_key: String,
    ordered_ids: Vec<EntityId>,
}

/// Records a sorting overlay into the ViewPreference store and round-trips
/// it through the server like any other mutation (§4.G: "not a side
/// channel").
pub struct ViewPreferenceApplySorting;

#[async_trait]
impl Instruction for ViewPreferenceApplySorting {
    fn resource_keys(&self, payload: &Value) -> Vec<ResourceKey> {
        match parse::<ApplySortingPayload>(payload) {
            Ok(p) => vec![ResourceKey::new(format!("view_preference:{}", p.view_key))],
            Err(_) => Vec::new(),
        }
    }

    fn validate(&self, payload: &Value) -> Result<(), InstructionError> {
        let p: ApplySortingPayload = parse(payload)?;
        if p.view_key.trim().is_empty() {
            return Err(InstructionError::Validation("view_key must not be empty".to_string()));
        }
        Ok(())
    }

    fn optimistic_apply(&self, payload: &Value, ctx: &InstructionContext) -> OptimisticSnapshot {
        let mut snapshot = OptimisticSnapshot::new();
        let p: ApplySortingPayload = match parse(payload) {
            Ok(p) => p,
            Err(_) => return snapshot,
        };
        let preference = ViewPreference::new(p.view_key, p.ordered_ids);
        let id = preference.id;
        let prior = ctx.store.get(EntityKind::ViewPreference, id);
        ctx.store.add_or_update(EntityKind::ViewPreference, Record::ViewPreference(preference));
        snapshot.push(EntityKind::ViewPreference, id, prior);
        snapshot
    }

    fn request(&self, payload: &Value, ctx: &InstructionContext) -> Option<OutboundRequest> {
        let p: ApplySortingPayload = parse(payload).ok()?;
        Some(
            OutboundRequest::new(HttpMethod::Put, format!("/view-preferences/{}", p.view_key))
                .with_body(payload.clone())
                .with_correlation_id(ctx.correlation_id.clone()),
        )
    }
}
