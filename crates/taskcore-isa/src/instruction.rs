use async_trait::async_trait;
use serde_json::Value;
use taskcore_store::EntityStore;
use taskcore_types::{
    CorrelationId, EntityId, EntityKind, InstructionError, OutboundRequest, Record, RequestExecutor,
    ResourceKey, TransactionEnvelope, TransportError,
};

/// One entry of an [`OptimisticSnapshot`]: the prior state of one record,
/// sufficient to undo one optimistic write (§9 "optimistic rollback without
/// mutable aliasing").
#[derive(Debug, Clone)]
pub struct SnapshotEntry {
    pub kind: EntityKind,
    pub id: EntityId,
    /// `None` means the record did not exist before the optimistic write
    /// (revert removes it); `Some` is the record to restore.
    pub prior: Option<Record>,
}

/// The minimal data required to undo an optimistic apply. Produced by
/// [`Instruction::optimistic_apply`] and consumed, unmodified, by
/// [`Instruction::optimistic_revert`].
#[derive(Debug, Clone, Default)]
pub struct OptimisticSnapshot(pub Vec<SnapshotEntry>);

impl OptimisticSnapshot {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, kind: EntityKind, id: EntityId, prior: Option<Record>) {
        self.0.push(SnapshotEntry { kind, id, prior });
    }
}

/// Context handed to every [`Instruction`] callback: the store it mutates
/// and the correlation id allocated for this instruction's lifetime.
pub struct InstructionContext<'a> {
    pub store: &'a EntityStore,
    pub correlation_id: CorrelationId,
}

/// Declarative metadata plus behavior for one instruction type (§4.E).
///
/// Exactly one of [`Instruction::request`] or [`Instruction::execute`]
/// should be overridden by a concrete implementation; the pipeline tries
/// `request` first and falls back to `execute` if it returns `None` (see
/// [`InstructionSet::register`] for the registration-time check).
#[async_trait]
pub trait Instruction: Send + Sync {
    /// Resources this instruction touches, given its payload. Drives
    /// hazard detection in the scheduler (§4.F SCH).
    fn resource_keys(&self, payload: &Value) -> Vec<ResourceKey>;

    /// If set, SCH enforces this as EX's deadline (§4.E).
    fn timeout_ms(&self) -> Option<u64> {
        None
    }

    /// Higher priority is scheduled first among otherwise-tied candidates
    /// (§4.F SCH tie-break is still FIFO among equal priorities).
    fn priority(&self) -> i32 {
        0
    }

    /// Pre-flight check. Failing aborts before any optimistic apply or
    /// request (§4.E).
    fn validate(&self, _payload: &Value) -> Result<(), InstructionError> {
        Ok(())
    }

    /// Mutate the store optimistically and return a snapshot sufficient to
    /// undo it. Instructions with nothing to apply optimistically (rare;
    /// most mutate at least the primary entity) return an empty snapshot.
    fn optimistic_apply(&self, _payload: &Value, _ctx: &InstructionContext) -> OptimisticSnapshot {
        OptimisticSnapshot::new()
    }

    /// Exact inverse of `optimistic_apply`, given the snapshot it
    /// produced.
    fn optimistic_revert(&self, snapshot: &OptimisticSnapshot, ctx: &InstructionContext) {
        for entry in &snapshot.0 {
            match &entry.prior {
                Some(record) => ctx.store.add_or_update(entry.kind, record.clone()),
                None => ctx.store.remove(entry.kind, entry.id),
            }
        }
    }

    /// Declarative HTTP request template. `None` means this instruction
    /// uses `execute` instead.
    fn request(&self, _payload: &Value, _ctx: &InstructionContext) -> Option<OutboundRequest> {
        None
    }

    /// Imperative alternative to `request`, for instructions whose
    /// behavior isn't a single templated call. `None` means this
    /// instruction uses `request` instead.
    async fn execute(
        &self,
        _payload: &Value,
        _ctx: &InstructionContext,
        _executor: &dyn RequestExecutor,
    ) -> Option<Result<TransactionEnvelope, TransportError>> {
        None
    }

    /// Post-commit hook, called by WB after a RESOLVED instruction's
    /// transaction has been applied.
    fn on_success(&self, _result: &TransactionEnvelope, _ctx: &InstructionContext) {}

    /// Post-rollback hook, called by WB after `optimistic_revert` (if any).
    fn on_failure(&self, _error: &InstructionError, _ctx: &InstructionContext) {}
}
