use crate::push::transport::PushTransport;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU8, Ordering::Relaxed};
use std::sync::Arc;
use std::time::Duration;
use taskcore_types::{ConnectionStatus, PushEvent, PushEventSource};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Reconnect backoff bounds (§9, §10 "push reconnect backoff bounds").
/// Exposed separately from `PipelineConfig` since the reconnecting
/// adapter is a `taskcore-http` concern, not a pipeline-driver one; the
/// demo binary wires the two together at startup.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectConfig {
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 250,
            max_backoff_ms: 30_000,
        }
    }
}

fn status_to_u8(status: ConnectionStatus) -> u8 {
    match status {
        ConnectionStatus::Connected => 0,
        ConnectionStatus::Reconnecting => 1,
        ConnectionStatus::Failed => 2,
    }
}

fn status_from_u8(v: u8) -> ConnectionStatus {
    match v {
        0 => ConnectionStatus::Connected,
        2 => ConnectionStatus::Failed,
        _ => ConnectionStatus::Reconnecting,
    }
}

/// `PushEventSource` adapter that dials an injected [`PushTransport`] and
/// reconnects with exponential backoff, capped at 30s (§6, §9).
///
/// `Failed` is reported only for the instant between a failed connect
/// attempt and the backoff sleep that follows it; `Reconnecting` covers
/// the sleep itself and the next dial. `recv` only ever returns `None`
/// once the source has been dropped (the driver task is aborted and its
/// channel closes), matching the "only on permanent shutdown" contract.
pub struct ReconnectingPushEventSource {
    events: mpsc::UnboundedReceiver<PushEvent>,
    status: Arc<AtomicU8>,
    driver: JoinHandle<()>,
}

impl ReconnectingPushEventSource {
    pub fn spawn(transport: Arc<dyn PushTransport>) -> Self {
        Self::spawn_with_config(transport, ReconnectConfig::default())
    }

    pub fn spawn_with_config(transport: Arc<dyn PushTransport>, config: ReconnectConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let status = Arc::new(AtomicU8::new(status_to_u8(ConnectionStatus::Reconnecting)));

        let driver_status = status.clone();
        let driver = tokio::spawn(async move {
            let mut backoff_ms = config.initial_backoff_ms;
            loop {
                driver_status.store(status_to_u8(ConnectionStatus::Reconnecting), Relaxed);
                match transport.connect().await {
                    Ok(mut stream) => {
                        driver_status.store(status_to_u8(ConnectionStatus::Connected), Relaxed);
                        backoff_ms = config.initial_backoff_ms;
                        loop {
                            match stream.recv_raw().await {
                                Some(Ok(event)) => {
                                    if tx.send(event).is_err() {
                                        return;
                                    }
                                }
                                Some(Err(e)) => {
                                    warn!(error = %e, "push transport reported an error, reconnecting");
                                    break;
                                }
                                None => {
                                    debug!("push transport connection closed, reconnecting");
                                    break;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to connect to push transport");
                        driver_status.store(status_to_u8(ConnectionStatus::Failed), Relaxed);
                    }
                }

                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = (backoff_ms * 2).min(config.max_backoff_ms);
            }
        });

        Self { events: rx, status, driver }
    }
}

impl Drop for ReconnectingPushEventSource {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

#[async_trait]
impl PushEventSource for ReconnectingPushEventSource {
    async fn recv(&mut self) -> Option<PushEvent> {
        self.events.recv().await
    }

    fn connection_status(&self) -> ConnectionStatus {
        status_from_u8(self.status.load(Relaxed))
    }
}
