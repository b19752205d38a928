use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use taskcore_types::{OutboundRequest, RequestExecutor, TransactionEnvelope, TransportError};

/// In-memory `RequestExecutor` for tests: replays a queue of canned
/// responses and records every request it was handed, mirroring the
/// teacher's in-memory port adapters used under `#[cfg(test)]`.
#[derive(Default)]
pub struct MockRequestExecutor {
    responses: Mutex<VecDeque<Result<TransactionEnvelope, TransportError>>>,
    received: Mutex<Vec<OutboundRequest>>,
}

impl MockRequestExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, response: Result<TransactionEnvelope, TransportError>) {
        self.responses.lock().push_back(response);
    }

    pub fn received(&self) -> Vec<OutboundRequest> {
        self.received.lock().clone()
    }
}

#[async_trait]
impl RequestExecutor for MockRequestExecutor {
    async fn execute(&self, request: OutboundRequest) -> Result<TransactionEnvelope, TransportError> {
        self.received.lock().push(request);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("MockRequestExecutor has no queued response".to_string())))
    }
}
