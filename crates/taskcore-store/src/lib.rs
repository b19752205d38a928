//! The Entity Store (§4.A): authoritative in-memory keyed collections with
//! reactive reads.
//!
//! Grounded on the teacher's in-memory coordination adapter
//! (`riptide-cache::adapters::memory_coordination`), which pairs a
//! `DashMap` of values with a `DashMap` of per-channel `broadcast`
//! senders for local pub/sub. Here the "channels" are per-kind change
//! notifications rather than message payloads: subscribers re-read
//! (`iter`/`get`) on notification instead of replaying a diff, which is
//! what lets the View Layer (§4.G) stay a pure projection (P5).

mod store;

pub use store::{ChangeSubscription, EntityStore};
