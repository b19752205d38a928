use taskcore_types::InstructionError;
use thiserror::Error;

/// What a caller's awaited instruction result can resolve to (§7). Wraps
/// the caller-facing [`InstructionError`] taxonomy plus the two failure
/// modes specific to getting a submission into the pipeline at all.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Instruction(#[from] InstructionError),

    #[error("unknown instruction type '{0}'")]
    UnknownInstructionType(String),

    /// The driver task is no longer running; submissions cannot be
    /// admitted. Distinct from a per-instruction failure.
    #[error("the pipeline driver has stopped")]
    DriverStopped,
}
