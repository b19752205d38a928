use crate::error::TxnError;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::str::FromStr;
use taskcore_store::EntityStore;
use taskcore_types::{ApplyMeta, DedupToken, EntityKind, TransactionEnvelope};
use tracing::{debug, trace, warn};

/// Default LRU capacity for recently-applied dedup tokens (§4.C).
pub const DEFAULT_DEDUP_CAPACITY: usize = 512;

/// Applies [`TransactionEnvelope`]s to an [`EntityStore`], exactly once per
/// dedup token (§4.C).
///
/// The internal lock serializes `apply` calls against each other; it is
/// never held across I/O because this type performs none — callers
/// (typically the pipeline's RES/WB stages, or the Interrupt Controller)
/// own any network interaction and hand this type only already-received
/// envelopes.
pub struct TransactionProcessor {
    recent: Mutex<LruCache<DedupToken, ()>>,
}

impl TransactionProcessor {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_DEDUP_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            recent: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Apply `envelope` to `store`. Idempotent per `meta`'s dedup token
    /// (§4.C, P3): a second `apply` with a token already seen is a no-op.
    pub fn apply(
        &self,
        store: &EntityStore,
        envelope: &TransactionEnvelope,
        meta: &ApplyMeta,
    ) -> Result<(), TxnError> {
        let token = meta.dedup_token();

        {
            let mut recent = self.recent.lock();
            if let Some(token) = &token {
                if recent.contains(token) {
                    debug!(%token, "transaction already applied, skipping");
                    return Ok(());
                }
            }

            self.apply_primary_and_side_effects(store, envelope)?;

            if let Some(token) = token {
                recent.put(token, ());
            }
        }

        Ok(())
    }

    fn apply_primary_and_side_effects(
        &self,
        store: &EntityStore,
        envelope: &TransactionEnvelope,
    ) -> Result<(), TxnError> {
        let primary_kind = envelope.entity.kind();
        store.add_or_update(primary_kind, envelope.entity.clone());
        trace!(kind = %primary_kind, id = %envelope.entity.id(), "applied primary entity");

        // Side effect groups are keyed by a HashMap, whose iteration order
        // is unspecified; that's fine, since groups touch disjoint kinds
        // and the spec only requires order to be preserved *within* a
        // group (§4.C), which Vec iteration already guarantees.
        for (kind_str, group) in &envelope.side_effects {
            let kind = EntityKind::from_str(kind_str)
                .map_err(|_| TxnError::UnknownEntityKind(kind_str.clone()))?;

            let mut additions = Vec::with_capacity(group.added_or_updated.len());
            for record in &group.added_or_updated {
                if record.kind() != kind {
                    return Err(TxnError::MismatchedSideEffectKind {
                        kind: kind_str.clone(),
                        actual: record.kind().to_string(),
                    });
                }
                additions.push(record.clone());
            }
            store.batch_add_or_update(kind, additions);

            for id in &group.removed {
                store.remove(kind, *id);
            }

            trace!(
                kind = %kind,
                added_or_updated = group.added_or_updated.len(),
                removed = group.removed.len(),
                "applied side effect group"
            );
        }

        Ok(())
    }
}

impl Default for TransactionProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskcore_types::{ApplySource, EntityId, Record, SideEffectGroup, SideEffects, Task, TimeBlock};

    fn task_record(id: EntityId, title: &str, deleted: bool) -> Record {
        Record::Task(Task {
            id,
            title: title.to_string(),
            is_completed: false,
            archived: false,
            deleted,
            due_date: None,
            scheduled_date: None,
            area_id: None,
            project_id: None,
            section_id: None,
            recurrence_id: None,
            recurrence_original_date: None,
        })
    }

    fn time_block_record(id: EntityId, task_id: EntityId) -> Record {
        Record::TimeBlock(TimeBlock {
            id,
            task_id: Some(task_id),
            date: chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            start_minute: 0,
            duration_minutes: 30,
            deleted: false,
        })
    }

    #[test]
    fn applying_twice_with_same_token_is_a_no_op() {
        let store = EntityStore::new();
        let processor = TransactionProcessor::new();
        let id = EntityId::new();
        let envelope = TransactionEnvelope::new(task_record(id, "Remote", false)).with_event_id("e1");
        let meta = ApplyMeta {
            event_id: Some("e1".to_string()),
            source: Some(ApplySource::Push),
            ..Default::default()
        };

        processor.apply(&store, &envelope, &meta).unwrap();
        processor.apply(&store, &envelope, &meta).unwrap();

        assert_eq!(store.len(EntityKind::Task), 1);
    }

    #[test]
    fn side_effect_removal_is_applied_atomically_with_primary() {
        let store = EntityStore::new();
        let processor = TransactionProcessor::new();

        let task_id = EntityId::new();
        let block_id = EntityId::new();
        store.add_or_update(EntityKind::Task, task_record(task_id, "T1", false));
        store.add_or_update(EntityKind::TimeBlock, time_block_record(block_id, task_id));

        let mut side_effects: SideEffects = SideEffects::new();
        side_effects.insert(
            EntityKind::TimeBlock.to_string(),
            SideEffectGroup {
                added_or_updated: vec![],
                removed: vec![block_id],
            },
        );
        let envelope = TransactionEnvelope {
            entity: task_record(task_id, "T1", true),
            side_effects,
            correlation_id: None,
            event_id: Some("e2".to_string()),
        };
        let meta = ApplyMeta {
            event_id: Some("e2".to_string()),
            source: Some(ApplySource::Push),
            ..Default::default()
        };

        processor.apply(&store, &envelope, &meta).unwrap();

        assert!(store.get(EntityKind::Task, task_id).unwrap().is_deleted());
        assert!(store.get(EntityKind::TimeBlock, block_id).is_none());
    }

    #[test]
    fn mismatched_side_effect_kind_is_rejected() {
        let store = EntityStore::new();
        let processor = TransactionProcessor::new();
        let task_id = EntityId::new();

        let mut side_effects: SideEffects = SideEffects::new();
        side_effects.insert(
            EntityKind::TimeBlock.to_string(),
            SideEffectGroup {
                added_or_updated: vec![task_record(EntityId::new(), "wrong kind", false)],
                removed: vec![],
            },
        );
        let envelope = TransactionEnvelope {
            entity: task_record(task_id, "T1", false),
            side_effects,
            correlation_id: None,
            event_id: Some("e3".to_string()),
        };
        let meta = ApplyMeta {
            event_id: Some("e3".to_string()),
            ..Default::default()
        };

        let err = processor.apply(&store, &envelope, &meta).unwrap_err();
        assert!(matches!(err, TxnError::MismatchedSideEffectKind { .. }));
    }

    // P3: applying the same envelope twice under the same dedup token
    // yields the same store as applying it once, for any title.
    proptest::proptest! {
        #[test]
        fn applying_an_envelope_twice_matches_applying_it_once(title in "[a-zA-Z0-9 ]{1,20}") {
            let store = EntityStore::new();
            let processor = TransactionProcessor::new();
            let id = EntityId::new();
            let envelope = TransactionEnvelope::new(task_record(id, &title, false)).with_event_id("e-prop");
            let meta = ApplyMeta {
                event_id: Some("e-prop".to_string()),
                source: Some(ApplySource::Push),
                ..Default::default()
            };

            processor.apply(&store, &envelope, &meta).unwrap();
            let once = store.get(EntityKind::Task, id).unwrap();

            processor.apply(&store, &envelope, &meta).unwrap();
            let twice = store.get(EntityKind::Task, id).unwrap();

            proptest::prop_assert_eq!(once, twice);
            proptest::prop_assert_eq!(store.len(EntityKind::Task), 1);
        }
    }

    #[test]
    fn applying_without_a_dedup_token_always_applies() {
        let store = EntityStore::new();
        let processor = TransactionProcessor::new();
        let id = EntityId::new();
        let envelope = TransactionEnvelope::new(task_record(id, "A", false));
        let meta = ApplyMeta::default();

        processor.apply(&store, &envelope, &meta).unwrap();
        let envelope2 = TransactionEnvelope::new(task_record(id, "B", false));
        processor.apply(&store, &envelope2, &meta).unwrap();

        assert_eq!(store.get(EntityKind::Task, id).unwrap().as_task().unwrap().title, "B");
    }
}
