use crate::error::PipelineError;
use serde_json::Value;
use std::time::Instant;
use taskcore_isa::OptimisticSnapshot;
use taskcore_types::{CorrelationId, InstructionError, ResourceKey, TransactionEnvelope};
use tokio::sync::oneshot;

pub type InstructionId = u64;

/// Lifecycle state of a [`QueuedInstruction`] (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionStatus {
    Pending,
    Issued,
    Executing,
    Resolved,
    Failed,
    Completed,
    RolledBack,
}

/// Per-stage timestamps, stamped as the instruction moves through IF, SCH,
/// EX, and WB (§3).
#[derive(Debug, Clone, Default)]
pub struct StageTimestamps {
    pub if_at: Option<Instant>,
    pub sch_at: Option<Instant>,
    pub ex_at: Option<Instant>,
    pub wb_at: Option<Instant>,
}

pub type CallerResponder = oneshot::Sender<Result<TransactionEnvelope, PipelineError>>;

/// One in-flight mutation as it moves through IF → SCH → EX → RES → WB
/// (§3).
pub struct QueuedInstruction {
    pub id: InstructionId,
    pub instruction_type: String,
    pub payload: Value,
    pub correlation_id: CorrelationId,
    pub status: InstructionStatus,
    pub resource_keys: Vec<ResourceKey>,
    pub timeout_ms: Option<u64>,
    pub timestamps: StageTimestamps,
    pub optimistic_snapshot: Option<OptimisticSnapshot>,
    pub error: Option<InstructionError>,
    pub result: Option<TransactionEnvelope>,
    pub responder: Option<CallerResponder>,
    pub created_at: Instant,
}

impl QueuedInstruction {
    pub fn new(id: InstructionId, instruction_type: String, payload: Value, correlation_id: CorrelationId, responder: CallerResponder) -> Self {
        Self {
            id,
            instruction_type,
            payload,
            correlation_id,
            status: InstructionStatus::Pending,
            resource_keys: Vec::new(),
            timeout_ms: None,
            timestamps: StageTimestamps {
                if_at: Some(Instant::now()),
                ..Default::default()
            },
            optimistic_snapshot: None,
            error: None,
            result: None,
            responder: Some(responder),
            created_at: Instant::now(),
        }
    }
}
