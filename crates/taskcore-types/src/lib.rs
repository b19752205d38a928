//! Foundation types for the task-pipeline core: entity kinds, the
//! `TransactionEnvelope` wire shape, the caller-facing error taxonomy, and
//! the ports through which the pipeline reaches external collaborators
//! (§1, §3, §6, §7).
//!
//! Every other crate in this workspace depends on this one and nothing
//! else upstream of it, mirroring how `riptide-types` anchors the
//! teacher's workspace.

pub mod entity;
pub mod envelope;
pub mod error;
pub mod ids;
pub mod ports;

pub use entity::{
    Area, EntityKind, Project, ProjectSection, Record, Recurrence, SideEffectGroup, SideEffects,
    Setting, Task, Template, TimeBlock, ViewPreference,
};
pub use envelope::{ApplyMeta, ApplySource, DedupToken, TransactionEnvelope};
pub use error::{InstructionError, TransportError};
pub use ids::{CorrelationId, EntityId, ResourceKey};
pub use ports::{ConnectionStatus, HttpMethod, OutboundRequest, PushEvent, PushEventSource, RequestExecutor};
