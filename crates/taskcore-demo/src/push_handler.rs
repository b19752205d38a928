//! Applies an inbound push event's envelope through the same
//! [`TransactionProcessor`] the pipeline's RES stage uses, so the demo's
//! Interrupt Controller shares one dedup LRU with local writes (§4.C,
//! §4.D).

use async_trait::async_trait;
use std::sync::Arc;
use taskcore_events::EventHandler;
use taskcore_store::EntityStore;
use taskcore_txn::TransactionProcessor;
use taskcore_types::{ApplyMeta, ApplySource, PushEvent};

pub struct ApplyToStore {
    store: Arc<EntityStore>,
    txn: Arc<TransactionProcessor>,
}

impl ApplyToStore {
    pub fn new(store: Arc<EntityStore>, txn: Arc<TransactionProcessor>) -> Self {
        Self { store, txn }
    }
}

#[async_trait]
impl EventHandler for ApplyToStore {
    async fn handle(&self, event: &PushEvent) -> anyhow::Result<()> {
        let meta = ApplyMeta {
            correlation_id: event.correlation_id.clone(),
            event_id: event.event_id.clone(),
            source: Some(ApplySource::Push),
        };
        self.txn.apply(&self.store, &event.payload, &meta)?;
        Ok(())
    }
}
