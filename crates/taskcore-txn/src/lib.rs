//! The Transaction Processor (§4.C): applies a server-returned
//! [`TransactionEnvelope`] to the Entity Store exactly once, regardless of
//! how many times the same envelope is observed (local HTTP response, or
//! its push-event echo that the Interrupt Controller failed to suppress).
//!
//! Grounded on the teacher's job-result application path
//! (`riptide-workers`'s single-writer job completion handling) combined
//! with the bounded-LRU dedup shape used by the teacher's idempotency
//! adapters: here the LRU lives in-process rather than in Redis, because
//! the Transaction Processor's dedup is a second line of defense behind
//! the Correlation Registry (§4.B), not the primary mechanism.

mod error;
mod processor;

pub use error::TxnError;
pub use processor::{TransactionProcessor, DEFAULT_DEDUP_CAPACITY};
