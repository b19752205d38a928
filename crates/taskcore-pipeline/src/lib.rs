//! The pipeline driver: IF, SCH, EX, RES, WB as a single background task
//! (§3, §4.F, §5), wired from an [`taskcore_isa::InstructionSet`] and a
//! [`taskcore_types::RequestExecutor`].
//!
//! Mirrors the shape of the teacher's `riptide-workers` job loop: one
//! long-running task owns all mutable scheduling state, callers interact
//! through channels and `oneshot` promises rather than shared locks.

mod config;
mod driver;
mod error;
mod metrics;
mod queued;
mod scheduler;

pub use config::PipelineConfig;
pub use driver::Pipeline;
pub use error::PipelineError;
pub use metrics::PipelineMetrics;
pub use queued::{InstructionId, InstructionStatus, StageTimestamps};
