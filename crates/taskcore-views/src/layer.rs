use crate::filter;
use crate::key::ViewKey;
use crate::sort;
use chrono::{NaiveDate, Utc};
use taskcore_store::EntityStore;
use taskcore_types::EntityId;

/// Views needing the recurring-task dedup rule applied (§4.G: "wherever
/// specified by the filter"). Only `deadline` calls it out explicitly.
fn needs_recurring_dedup(view: &ViewKey) -> bool {
    matches!(view, ViewKey::Deadline)
}

/// Recomputes a [`ViewKey`] against the current state of an
/// [`EntityStore`] (§4.G). Stateless: every call re-derives the result
/// from the store, matching "recomputed reactively from the Entity
/// Store" — there is no cached view state to invalidate.
pub struct ViewLayer<'a> {
    store: &'a EntityStore,
}

impl<'a> ViewLayer<'a> {
    pub fn new(store: &'a EntityStore) -> Self {
        Self { store }
    }

    /// `get_view(view_key) -> ordered sequence of entities` (§4.G), using
    /// today's date for schedule-relative filters.
    pub fn get_view(&self, view: &ViewKey) -> Vec<taskcore_types::Task> {
        self.get_view_as_of(view, Utc::now().date_naive())
    }

    /// Same as [`Self::get_view`] but with an explicit reference date, so
    /// callers (and tests) don't depend on wall-clock time.
    pub fn get_view_as_of(&self, view: &ViewKey, today: NaiveDate) -> Vec<taskcore_types::Task> {
        let mut matching: Vec<taskcore_types::Task> = self
            .store
            .iter(taskcore_types::EntityKind::Task)
            .into_iter()
            .filter_map(|record| record.as_task().cloned())
            .filter(|task| filter::matches(view, task, today))
            .collect();

        if needs_recurring_dedup(view) {
            matching = sort::dedup_recurring(matching);
        }

        if let ViewKey::Deadline = view {
            matching.sort_by(|a, b| a.due_date.cmp(&b.due_date));
        }

        if let Some(overlay) = self.sorting_overlay(view) {
            matching = sort::apply_overlay(matching, &overlay);
        }

        matching
    }

    fn sorting_overlay(&self, view: &ViewKey) -> Option<Vec<EntityId>> {
        let id = EntityId::from_name("view_preference", &view.canonical_name());
        let record = self.store.get(taskcore_types::EntityKind::ViewPreference, id)?;
        let preference = record.as_view_preference()?;
        if preference.deleted {
            return None;
        }
        Some(preference.ordered_ids.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskcore_types::{EntityKind, Record, Task, ViewPreference};

    fn task(id: EntityId, title: &str) -> Task {
        Task {
            id,
            title: title.to_string(),
            is_completed: false,
            archived: false,
            deleted: false,
            due_date: None,
            scheduled_date: None,
            area_id: None,
            project_id: None,
            section_id: None,
            recurrence_id: None,
            recurrence_original_date: None,
        }
    }

    #[test]
    fn get_view_applies_a_recorded_sorting_overlay() {
        let store = EntityStore::new();
        let a = EntityId::new();
        let b = EntityId::new();
        store.add_or_update(EntityKind::Task, Record::Task(task(a, "A")));
        store.add_or_update(EntityKind::Task, Record::Task(task(b, "B")));
        store.add_or_update(EntityKind::ViewPreference, Record::ViewPreference(ViewPreference::new("staging", vec![b, a])));

        let layer = ViewLayer::new(&store);
        let today = NaiveDate::from_ymd_opt(2026, 7, 26).unwrap();
        let view = layer.get_view_as_of(&ViewKey::Staging, today);

        assert_eq!(view.iter().map(|t| t.id).collect::<Vec<_>>(), vec![b, a]);
    }

    #[test]
    fn deadline_view_sorts_by_due_date_ascending() {
        let store = EntityStore::new();
        let near = EntityId::new();
        let far = EntityId::new();
        let mut near_task = task(near, "Near");
        near_task.due_date = NaiveDate::from_ymd_opt(2026, 8, 1);
        let mut far_task = task(far, "Far");
        far_task.due_date = NaiveDate::from_ymd_opt(2026, 9, 1);
        store.add_or_update(EntityKind::Task, Record::Task(far_task));
        store.add_or_update(EntityKind::Task, Record::Task(near_task));

        let layer = ViewLayer::new(&store);
        let today = NaiveDate::from_ymd_opt(2026, 7, 26).unwrap();
        let view = layer.get_view_as_of(&ViewKey::Deadline, today);

        assert_eq!(view[0].id, near);
        assert_eq!(view[1].id, far);
    }
}
