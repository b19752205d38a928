use crate::event::EventHandler;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use taskcore_correlation::CorrelationRegistry;
use taskcore_types::PushEvent;
use tracing::{debug, error, trace};

/// The single demultiplexing point for external events (§4.D).
pub struct InterruptController {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
    correlations: Arc<CorrelationRegistry>,
}

impl InterruptController {
    pub fn new(correlations: Arc<CorrelationRegistry>) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            correlations,
        }
    }

    /// Subscribe `handler` to every event of `event_type`.
    pub fn register(&self, event_type: impl Into<String>, handler: Arc<dyn EventHandler>) {
        let event_type = event_type.into();
        self.handlers.write().entry(event_type.clone()).or_default().push(handler);
        trace!(event_type = %event_type, "registered event handler");
    }

    /// Dispatch one event. If its correlation id matches a local in-flight
    /// write, the event is dropped as a redundant echo (§4.D); otherwise
    /// every handler registered for `event.event_type` runs in turn, with
    /// failures logged and swallowed rather than aborting the rest.
    pub async fn dispatch(&self, event: PushEvent) {
        if let Some(id) = &event.correlation_id {
            if self.correlations.consume(id).is_some() {
                debug!(correlation_id = %id, event_type = %event.event_type, "suppressed push event echoing a local write");
                return;
            }
        }

        let handlers = {
            let guard = self.handlers.read();
            guard.get(&event.event_type).cloned().unwrap_or_default()
        };

        if handlers.is_empty() {
            trace!(event_type = %event.event_type, "no handlers registered for event type");
            return;
        }

        for handler in handlers {
            if let Err(e) = handler.handle(&event).await {
                error!(event_type = %event.event_type, error = %e, "event handler failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use taskcore_types::{EntityId, Record, Task, TransactionEnvelope};

    fn task_event(event_type: &str, correlation_id: Option<taskcore_types::CorrelationId>) -> PushEvent {
        let id = EntityId::new();
        let record = Record::Task(Task {
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
        });
        PushEvent {
            event_id: Some("e1".to_string()),
            event_type: event_type.to_string(),
            correlation_id,
            payload: TransactionEnvelope::new(record),
        }
    }

    struct CountingHandler {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _event: &PushEvent) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl EventHandler for FailingHandler {
        async fn handle(&self, _event: &PushEvent) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("boom"))
        }
    }

    #[tokio::test]
    async fn dispatch_invokes_registered_handlers_for_matching_type() {
        let controller = InterruptController::new(Arc::new(CorrelationRegistry::new()));
        let calls = Arc::new(AtomicUsize::new(0));
        controller.register("task.updated", Arc::new(CountingHandler { calls: calls.clone() }));

        controller.dispatch(task_event("task.updated", None)).await;
        controller.dispatch(task_event("task.deleted", None)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn a_failing_handler_does_not_block_its_siblings() {
        let controller = InterruptController::new(Arc::new(CorrelationRegistry::new()));
        let calls = Arc::new(AtomicUsize::new(0));
        controller.register("task.updated", Arc::new(FailingHandler));
        controller.register("task.updated", Arc::new(CountingHandler { calls: calls.clone() }));

        controller.dispatch(task_event("task.updated", None)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn event_echoing_a_local_write_is_suppressed() {
        let registry = Arc::new(CorrelationRegistry::new());
        let controller = InterruptController::new(registry.clone());
        let calls = Arc::new(AtomicUsize::new(0));
        controller.register("task.updated", Arc::new(CountingHandler { calls: calls.clone() }));

        let id = registry.allocate();
        registry.register(id.clone(), "task.update");

        controller.dispatch(task_event("task.updated", Some(id))).await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
