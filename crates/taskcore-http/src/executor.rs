use crate::circuit_breaker::{CircuitBreaker, Clock, Config as CircuitConfig, RealClock};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use taskcore_types::{CorrelationId, HttpMethod, OutboundRequest, RequestExecutor, TransactionEnvelope, TransportError};
use tracing::{debug, warn};

const CORRELATION_HEADER: &str = "X-Correlation-ID";
const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// `RequestExecutor` adapter backed by `reqwest`, wrapped in a circuit
/// breaker the way `riptide-reliability` wraps outbound HTTP calls (§6a).
/// Per-request timeouts come from `OutboundRequest::timeout_ms`
/// (ultimately the issuing ISA's `timeout_ms()`) rather than a learned,
/// persisted profile — the core persists nothing (§6) — falling back to
/// [`DEFAULT_TIMEOUT_MS`] when unset.
pub struct HttpRequestExecutor {
    client: Client,
    base_url: String,
    circuit: CircuitBreaker,
}

impl HttpRequestExecutor {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_circuit_config(base_url, CircuitConfig::default(), Arc::new(RealClock))
    }

    pub fn with_circuit_config(base_url: impl Into<String>, circuit_config: CircuitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            circuit: CircuitBreaker::new(circuit_config, clock),
        }
    }

    fn method(&self, m: HttpMethod) -> reqwest::Method {
        match m {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }

    fn correlation_header(correlation_id: &Option<CorrelationId>) -> Option<String> {
        correlation_id.as_ref().map(|id| id.to_string())
    }
}

#[async_trait]
impl RequestExecutor for HttpRequestExecutor {
    async fn execute(&self, request: OutboundRequest) -> Result<TransactionEnvelope, TransportError> {
        let permit = self.circuit.try_acquire().map_err(|msg| TransportError::Network(format!("circuit breaker: {msg}")))?;

        let url = format!("{}{}", self.base_url, request.path);
        let timeout = Duration::from_millis(request.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS));

        let mut builder = self.client.request(self.method(request.method), &url).timeout(timeout);
        if let Some(header) = Self::correlation_header(&request.correlation_id) {
            builder = builder.header(CORRELATION_HEADER, header);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let result = builder.send().await;

        let outcome = match result {
            Ok(response) if response.status().is_success() => match response.json::<TransactionEnvelope>().await {
                Ok(envelope) => Ok(envelope),
                Err(e) => Err(TransportError::Decode(e.to_string())),
            },
            Ok(response) => {
                let status = response.status().as_u16();
                let message = response.text().await.unwrap_or_default();
                Err(TransportError::Http { status, message })
            }
            Err(e) if e.is_timeout() => Err(TransportError::Timeout),
            Err(e) => Err(TransportError::Network(e.to_string())),
        };

        match &outcome {
            Ok(_) => {
                debug!(url, "request succeeded");
                self.circuit.on_success();
            }
            Err(e) => {
                warn!(url, error = %e, "request failed");
                self.circuit.on_failure();
            }
        }
        drop(permit);
        outcome
    }
}
