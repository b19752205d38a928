//! External collaborator ports (§6a).
//!
//! These traits are the seam between the transport-agnostic pipeline and
//! concrete transports (`reqwest`, websockets, …), the same way
//! `riptide-types::ports` separates interface from adapter in the teacher
//! crate. Nothing in `taskcore-pipeline` names a transport crate directly.

use crate::envelope::TransactionEnvelope;
use crate::error::{InstructionError, TransportError};
use crate::ids::CorrelationId;
use async_trait::async_trait;
use serde_json::Value;

/// HTTP method of a declarative request template (§4.E, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// A materialized outbound request, produced by an ISA `request` template
/// (or directly by `execute`) and handed to a [`RequestExecutor`].
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: HttpMethod,
    /// Path relative to the collaborator's base URL, e.g. `/tasks/{id}`.
    pub path: String,
    pub body: Option<Value>,
    /// Propagated as the `X-Correlation-ID` header on every non-GET
    /// request (§6); `None` only ever appears on `GET /views/...` reads.
    pub correlation_id: Option<CorrelationId>,
    pub timeout_ms: Option<u64>,
}

impl OutboundRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            correlation_id: None,
            timeout_ms: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_correlation_id(mut self, id: CorrelationId) -> Self {
        self.correlation_id = Some(id);
        self
    }

    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }
}

/// Issues a materialized request and decodes the response as a
/// [`TransactionEnvelope`] (§6). The sole collaborator the EX/RES stages
/// talk to; they never construct an HTTP client themselves.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, request: OutboundRequest) -> Result<TransactionEnvelope, TransportError>;
}

/// Application-visible status of the push-event transport (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Reconnecting,
    Failed,
}

/// A single inbound push event (§6): `{ event_id, event_type,
/// correlation_id?, payload }`, where `payload` is a `TransactionEnvelope`.
#[derive(Debug, Clone)]
pub struct PushEvent {
    pub event_id: Option<String>,
    pub event_type: String,
    pub correlation_id: Option<CorrelationId>,
    pub payload: TransactionEnvelope,
}

/// A reconnecting source of push events (§6, §9). Implementations own
/// reconnect/backoff policy; the Interrupt Controller only ever calls
/// `recv`/`connection_status`.
#[async_trait]
pub trait PushEventSource: Send + Sync {
    /// Await the next event. Returns `None` only when the source has been
    /// permanently shut down (never merely disconnected — reconnection is
    /// the implementation's responsibility).
    async fn recv(&mut self) -> Option<PushEvent>;

    fn connection_status(&self) -> ConnectionStatus;
}

/// Maps a lower-level transport failure onto the caller-facing taxonomy
/// (§7). Used by the EX/RES stages when routing a [`RequestExecutor`]
/// result.
pub fn transport_to_instruction_error(e: TransportError) -> InstructionError {
    e.into()
}
