//! The Correlation Registry (§4.B): allocates opaque ids and records
//! in-flight local operations so the Interrupt Controller can suppress the
//! push-event echo of a write this process just made.
//!
//! Grounded on the teacher's Redis-backed idempotency store
//! (`riptide-cache::adapters::redis_idempotency`) minus the distributed
//! half: same "acquire a token, consume it exactly once, let it expire if
//! nobody ever consumes it" shape, backed by a `DashMap` instead of Redis
//! because the registry only ever needs to be correct within one process
//! (§4.B: "never authoritative for correctness").

mod registry;

pub use registry::{CorrelationEntry, CorrelationRegistry, DEFAULT_TTL};
