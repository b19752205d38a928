//! The caller-facing error taxonomy (§7).
//!
//! Every kind a failed instruction can surface through its awaited result.
//! Library crates in this workspace propagate `thiserror`-derived enums;
//! only the demo binary converts to `anyhow::Error` at its boundary,
//! mirroring the teacher's `CoreError` (`riptide-types::errors`) layering.

use thiserror::Error;

/// Error surfaced to a caller awaiting an instruction's outcome.
#[derive(Debug, Clone, Error)]
pub enum InstructionError {
    /// `ISA.validate` rejected the payload before any request was sent or
    /// optimistic state retained.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Network or response-decoding failure. Optimistic changes are
    /// reverted before this reaches the caller.
    #[error("transport error: {0}")]
    Transport(String),

    /// HTTP 4xx/5xx, or a 2xx response whose body was not a well-formed
    /// `TransactionEnvelope`.
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    /// The request exceeded `meta.timeout_ms`. Treated as a `Transport`
    /// failure for rollback purposes (§7) but reported distinctly so
    /// callers can distinguish slow servers from hard failures.
    #[error("request timed out after {0}ms")]
    Timeout(u64),

    /// The scheduler detected a condition that resource-acquisition
    /// acyclicity should make impossible. Surfaced as a diagnostic; by
    /// construction this variant should never be observed in practice.
    #[error("internal scheduler conflict: {0}")]
    ConflictInternal(String),

    /// The Transaction Processor could not apply a side-effect group
    /// (malformed envelope). Treated as a `Server` failure for rollback
    /// purposes.
    #[error("failed to apply transaction: {0}")]
    ApplyFailure(String),

    /// IF rejected the submission because the pending queue was at its
    /// configured capacity (§9 open question, resolved).
    #[error("pending queue is full (capacity {0})")]
    RateLimited(usize),
}

impl InstructionError {
    /// Whether this failure reverts optimistic state. All instruction
    /// failures except a rejected validation do, since validation failures
    /// never reach the optimistic-apply step (§7).
    pub fn requires_rollback(&self) -> bool {
        !matches!(self, InstructionError::Validation(_) | InstructionError::RateLimited(_))
    }
}

/// Error returned by a [`crate::ports::RequestExecutor`] adapter. Lower in
/// the stack than [`InstructionError`]; the pipeline's EX/RES stages map
/// this onto the caller-facing taxonomy.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("http {status}: {message}")]
    Http { status: u16, message: String },
    #[error("request timed out")]
    Timeout,
}

impl From<TransportError> for InstructionError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Network(m) => InstructionError::Transport(m),
            TransportError::Decode(m) => InstructionError::ApplyFailure(m),
            TransportError::Http { status, message } => InstructionError::Server { status, message },
            TransportError::Timeout => InstructionError::Timeout(0),
        }
    }
}
