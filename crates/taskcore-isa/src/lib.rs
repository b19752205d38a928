//! The Instruction Set (§4.E): a registry, keyed by instruction type, of
//! declarative records describing how the pipeline should handle one kind
//! of mutation — what resources it touches, how to apply it optimistically
//! and revert it, and how to turn it into a request.
//!
//! The pipeline crate never names a concrete instruction type; it only
//! calls through the [`Instruction`] trait. Built-in instructions under
//! [`builtin`] are reference implementations for the generic entity kinds
//! of the data model, grounded the way the teacher ships concrete
//! [`JobProcessor`](https://docs.rs/riptide-workers) implementations
//! alongside its generic `Worker`.

mod instruction;
mod registry;

pub mod builtin;

pub use instruction::{Instruction, InstructionContext, OptimisticSnapshot, SnapshotEntry};
pub use registry::InstructionSet;
