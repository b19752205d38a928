use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::RwLock;
use taskcore_types::{EntityId, EntityKind, Record};
use tokio::sync::broadcast;
use tracing::{debug, trace};

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// One kind's insertion-ordered collection plus its change-notification
/// channel. `IndexMap` gives O(1) lookup/remove while preserving
/// insertion order for `iter` (§4.A).
struct KindStore {
    records: RwLock<IndexMap<EntityId, Record>>,
    changed: broadcast::Sender<()>,
}

impl KindStore {
    fn new() -> Self {
        let (changed, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            records: RwLock::new(IndexMap::new()),
            changed,
        }
    }

    fn notify(&self) {
        // A lagged/closed broadcast channel is not an error here: readers
        // always re-derive state from the store rather than consuming a
        // payload, so a missed notification only delays a refresh that the
        // next change (or an explicit re-read) will catch up on.
        let _ = self.changed.send(());
    }
}

/// The authoritative in-memory Entity Store (§4.A).
///
/// Writes are observable to all readers before the writing call returns:
/// every mutating method takes the kind's write lock for its full
/// duration and releases it only after the change notification fires.
pub struct EntityStore {
    kinds: DashMap<EntityKind, KindStore>,
}

impl EntityStore {
    pub fn new() -> Self {
        let kinds = DashMap::new();
        for kind in EntityKind::ALL {
            kinds.insert(kind, KindStore::new());
        }
        Self { kinds }
    }

    fn kind_store(&self, kind: EntityKind) -> dashmap::mapref::one::Ref<'_, EntityKind, KindStore> {
        self.kinds
            .get(&kind)
            .expect("EntityStore is pre-populated with every EntityKind at construction")
    }

    /// Insert or replace a record by id (§4.A).
    ///
    /// I2: callers must not revive a record whose last known state had
    /// `deleted = true` within the same pipeline run; the store itself
    /// does not enforce this (a server transaction is allowed to replace
    /// a soft-deleted record wholesale), so the invariant is the
    /// Transaction Processor's and ISA authors' responsibility.
    pub fn add_or_update(&self, kind: EntityKind, record: Record) {
        debug_assert_eq!(record.kind(), kind, "record kind must match the target collection");
        let ks = self.kind_store(kind);
        {
            let mut records = ks.records.write();
            records.insert(record.id(), record);
        }
        ks.notify();
        trace!(kind = %kind, "entity store write");
    }

    /// Atomic at the granularity of this single kind: no reader observes
    /// a partially-applied batch (§4.A).
    pub fn batch_add_or_update(&self, kind: EntityKind, records: Vec<Record>) {
        if records.is_empty() {
            return;
        }
        let ks = self.kind_store(kind);
        {
            let mut guard = ks.records.write();
            for record in records {
                debug_assert_eq!(record.kind(), kind, "record kind must match the target collection");
                guard.insert(record.id(), record);
            }
        }
        ks.notify();
        trace!(kind = %kind, "entity store batch write");
    }

    /// Idempotent: removing an absent id is a no-op, not an error.
    pub fn remove(&self, kind: EntityKind, id: EntityId) {
        let ks = self.kind_store(kind);
        let removed = {
            let mut records = ks.records.write();
            records.shift_remove(&id).is_some()
        };
        if removed {
            ks.notify();
            trace!(kind = %kind, id = %id, "entity store remove");
        }
    }

    pub fn get(&self, kind: EntityKind, id: EntityId) -> Option<Record> {
        self.kind_store(kind).records.read().get(&id).cloned()
    }

    /// Enumerate current records for `kind` in insertion order.
    pub fn iter(&self, kind: EntityKind) -> Vec<Record> {
        self.kind_store(kind).records.read().values().cloned().collect()
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        self.kind_store(kind).records.read().len()
    }

    /// A reactive read handle for `kind` (§4.A): the View Layer
    /// re-projects whenever this fires, rather than being handed a diff.
    pub fn subscribe(&self, kind: EntityKind) -> ChangeSubscription {
        ChangeSubscription {
            kind,
            receiver: self.kind_store(kind).changed.subscribe(),
        }
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A handle that resolves whenever `kind`'s collection changes. Carries no
/// payload by design (see module docs) — callers re-read the store.
pub struct ChangeSubscription {
    kind: EntityKind,
    receiver: broadcast::Receiver<()>,
}

impl ChangeSubscription {
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Wait for the next change. Returns `Ok(())` even after a lagged
    /// receiver skips notifications, since the only useful signal here is
    /// "something changed, go re-read" (§4.A).
    pub async fn changed(&mut self) {
        loop {
            match self.receiver.recv().await {
                Ok(()) => return,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(kind = %self.kind, skipped, "change subscription lagged, coalescing");
                    return;
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }
}
