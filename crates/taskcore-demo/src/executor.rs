//! A [`RequestExecutor`] that never leaves the process.
//!
//! The EX stage always runs `optimistic_apply` before handing the
//! instruction's request to an executor (§4.F), so by the time this runs
//! the Entity Store already holds the state a real server would echo
//! back. Rather than hand-author a matching `TransactionEnvelope` for
//! every scripted step, this reads the record the request's path names
//! straight back out of the shared store and wraps it in an envelope —
//! a stand-in for a server round trip, not a model of one.

use async_trait::async_trait;
use std::sync::Arc;
use taskcore_store::EntityStore;
use taskcore_types::{EntityId, EntityKind, OutboundRequest, Record, TransactionEnvelope, TransportError};

pub struct DemoExecutor {
    store: Arc<EntityStore>,
}

impl DemoExecutor {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self { store }
    }

    fn resolve(&self, request: &OutboundRequest) -> Option<Record> {
        let segments: Vec<&str> = request.path.trim_matches('/').split('/').collect();
        match segments.as_slice() {
            ["tasks"] => {
                let id: EntityId = request.body.as_ref()?.get("id")?.as_str()?.parse().ok()?;
                self.store.get(EntityKind::Task, id)
            }
            ["tasks", id, ..] => {
                let id: EntityId = id.parse().ok()?;
                self.store.get(EntityKind::Task, id)
            }
            ["time-blocks"] => {
                let id: EntityId = request.body.as_ref()?.get("id")?.as_str()?.parse().ok()?;
                self.store.get(EntityKind::TimeBlock, id)
            }
            ["view-preferences", view_key] => {
                let id = EntityId::from_name("view_preference", view_key);
                self.store.get(EntityKind::ViewPreference, id)
            }
            _ => None,
        }
    }
}

#[async_trait]
impl taskcore_types::RequestExecutor for DemoExecutor {
    async fn execute(&self, request: OutboundRequest) -> Result<TransactionEnvelope, TransportError> {
        let correlation_id = request.correlation_id.clone();
        let method = request.method;
        let path = request.path.clone();
        let record = self
            .resolve(&request)
            .ok_or_else(|| TransportError::Decode(format!("no record to echo back for {} {path}", method.as_str())))?;

        let mut envelope = TransactionEnvelope::new(record);
        if let Some(id) = correlation_id {
            envelope = envelope.with_correlation_id(id);
        }
        Ok(envelope)
    }
}
