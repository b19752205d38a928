use async_trait::async_trait;
use taskcore_types::{PushEvent, TransportError};

/// One already-connected inbound stream of raw push events. Implementors
/// own the underlying socket/connection; `recv_raw` returning `None`
/// signals the connection itself closed (not a permanent shutdown —
/// [`super::reconnect::ReconnectingPushEventSource`] reconnects).
#[async_trait]
pub trait RawPushStream: Send {
    async fn recv_raw(&mut self) -> Option<Result<PushEvent, TransportError>>;
}

/// Low-level transport the reconnecting adapter dials (§6a: "around an
/// injected low-level transport stream"). A concrete implementation
/// (websocket, SSE, long-poll) lives outside this crate's required
/// surface; callers inject whichever transport fits their server.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn RawPushStream>, TransportError>;
}
