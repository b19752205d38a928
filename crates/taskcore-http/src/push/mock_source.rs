use async_trait::async_trait;
use std::sync::atomic::{AtomicU8, Ordering::Relaxed};
use std::sync::Arc;
use taskcore_types::{ConnectionStatus, PushEvent, PushEventSource};
use tokio::sync::mpsc;

/// In-memory `PushEventSource` for tests: lets a test inject events
/// synchronously via [`MockPushEventSourceHandle::push`] without standing
/// up a real transport (§6a).
pub struct MockPushEventSource {
    events: mpsc::UnboundedReceiver<PushEvent>,
    status: Arc<AtomicU8>,
}

#[derive(Clone)]
pub struct MockPushEventSourceHandle {
    events: mpsc::UnboundedSender<PushEvent>,
    status: Arc<AtomicU8>,
}

impl MockPushEventSourceHandle {
    pub fn push(&self, event: PushEvent) {
        let _ = self.events.send(event);
    }

    pub fn set_status(&self, status: ConnectionStatus) {
        self.status.store(status as u8, Relaxed);
    }
}

impl MockPushEventSource {
    pub fn new() -> (Self, MockPushEventSourceHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let status = Arc::new(AtomicU8::new(ConnectionStatus::Connected as u8));
        (
            Self { events: rx, status: status.clone() },
            MockPushEventSourceHandle { events: tx, status },
        )
    }
}

#[async_trait]
impl PushEventSource for MockPushEventSource {
    async fn recv(&mut self) -> Option<PushEvent> {
        self.events.recv().await
    }

    fn connection_status(&self) -> ConnectionStatus {
        match self.status.load(Relaxed) {
            0 => ConnectionStatus::Connected,
            2 => ConnectionStatus::Failed,
            _ => ConnectionStatus::Reconnecting,
        }
    }
}
