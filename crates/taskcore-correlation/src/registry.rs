use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use taskcore_types::CorrelationId;
use tracing::{debug, trace};

/// Default time-to-live for an unconsumed correlation entry (§3).
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// An in-flight local write, tracked so its push-event echo can be
/// recognized and dropped (§3, §4.D).
#[derive(Debug, Clone)]
pub struct CorrelationEntry {
    pub correlation_id: CorrelationId,
    pub instruction_type: String,
    pub created_at: Instant,
    pub expires_at: Option<Instant>,
}

impl CorrelationEntry {
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|t| now >= t)
    }
}

/// Sweep the whole table every this-many `allocate`/`register` calls, so
/// TTL enforcement doesn't depend solely on an external background task
/// (§4.B, §9 "TTL-expired correlation entries").
const AMORTIZED_SWEEP_INTERVAL: u64 = 64;

pub struct CorrelationRegistry {
    entries: DashMap<CorrelationId, CorrelationEntry>,
    ttl: Duration,
    ops_since_sweep: AtomicU64,
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            ops_since_sweep: AtomicU64::new(0),
        }
    }

    /// Allocate a fresh, unguessable correlation id. Does not yet register
    /// it — WB does that once the optimistic write actually happens
    /// (§3: "inserted by WB-optimistic-write").
    pub fn allocate(&self) -> CorrelationId {
        self.maybe_sweep();
        CorrelationId::allocate()
    }

    /// Record an in-flight local write, called by WB on optimistic apply.
    pub fn register(&self, id: CorrelationId, instruction_type: impl Into<String>) {
        self.maybe_sweep();
        let now = Instant::now();
        self.entries.insert(
            id.clone(),
            CorrelationEntry {
                correlation_id: id,
                instruction_type: instruction_type.into(),
                created_at: now,
                expires_at: Some(now + self.ttl),
            },
        );
    }

    /// Atomic test-and-remove: the only primitive this registry truly
    /// needs to be correct under concurrent `register`/`consume` (§4.B,
    /// §5). Returns `None` both when the id was never registered and when
    /// it already expired — callers can't and shouldn't distinguish those.
    pub fn consume(&self, id: &CorrelationId) -> Option<CorrelationEntry> {
        let (_, entry) = self.entries.remove(id)?;
        if entry.is_expired(Instant::now()) {
            trace!(correlation_id = %entry.correlation_id, "consumed an already-expired correlation entry");
            return None;
        }
        Some(entry)
    }

    /// Sweep entries older than their TTL. Safe to call at any time from
    /// any number of callers; a missed sweep only delays garbage
    /// collection; it never causes incorrect dedup (§4.B).
    pub fn expire(&self) {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let swept = before - self.entries.len();
        if swept > 0 {
            debug!(swept, "correlation registry expired stale entries");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn maybe_sweep(&self) {
        let count = self.ops_since_sweep.fetch_add(1, Ordering::Relaxed) + 1;
        if count % AMORTIZED_SWEEP_INTERVAL == 0 {
            self.expire();
        }
    }
}

impl Default for CorrelationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_consume_returns_entry_once() {
        let registry = CorrelationRegistry::new();
        let id = registry.allocate();
        registry.register(id.clone(), "task.complete");

        assert!(registry.consume(&id).is_some());
        assert!(registry.consume(&id).is_none(), "consume must be test-and-remove");
    }

    #[test]
    fn consume_of_unregistered_id_is_none() {
        let registry = CorrelationRegistry::new();
        let id = CorrelationId::allocate();
        assert!(registry.consume(&id).is_none());
    }

    #[test]
    fn expired_entries_are_swept() {
        let registry = CorrelationRegistry::with_ttl(Duration::from_millis(1));
        let id = registry.allocate();
        registry.register(id.clone(), "task.complete");

        std::thread::sleep(Duration::from_millis(5));
        registry.expire();

        assert!(registry.is_empty());
        assert!(registry.consume(&id).is_none());
    }

    #[test]
    fn allocations_are_globally_unique_within_process() {
        let registry = CorrelationRegistry::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(registry.allocate()));
        }
    }
}
