use std::collections::HashMap;
use taskcore_types::{EntityId, Task};

/// Group `tasks` by `recurrence_id`; within each group, drop completed
/// instances, then keep only the incomplete instance with the
/// lexicographically smallest `recurrence_original_date` (§4.G). Tasks
/// with no `recurrence_id` pass through untouched.
pub fn dedup_recurring(tasks: Vec<Task>) -> Vec<Task> {
    let mut singles = Vec::new();
    let mut groups: HashMap<EntityId, Vec<Task>> = HashMap::new();

    for task in tasks {
        match task.recurrence_id {
            Some(recurrence_id) => groups.entry(recurrence_id).or_default().push(task),
            None => singles.push(task),
        }
    }

    for (_, mut group) in groups {
        group.retain(|t| !t.is_completed);
        if let Some(winner) = group
            .into_iter()
            .min_by(|a, b| a.recurrence_original_date.cmp(&b.recurrence_original_date))
        {
            singles.push(winner);
        }
    }

    singles
}

/// Apply a sorting overlay (§4.G): tasks whose id appears in `overlay` are
/// emitted in overlay order; the rest follow in their original (natural
/// insertion) order. `tasks` is assumed to already be in the Entity
/// Store's insertion order.
pub fn apply_overlay(tasks: Vec<Task>, overlay: &[EntityId]) -> Vec<Task> {
    let mut by_id: HashMap<EntityId, Task> = tasks.iter().map(|t| (t.id, t.clone())).collect();
    let mut ordered = Vec::with_capacity(by_id.len());

    for id in overlay {
        if let Some(task) = by_id.remove(id) {
            ordered.push(task);
        }
    }

    for task in tasks {
        if let Some(task) = by_id.remove(&task.id) {
            ordered.push(task);
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: EntityId, recurrence_id: Option<EntityId>, original_date: Option<&str>, completed: bool) -> Task {
        Task {
            id,
            title: "T".to_string(),
            is_completed: completed,
            archived: false,
            deleted: false,
            due_date: None,
            scheduled_date: None,
            area_id: None,
            project_id: None,
            section_id: None,
            recurrence_id,
            recurrence_original_date: original_date.map(|s| s.to_string()),
        }
    }

    #[test]
    fn dedup_keeps_the_earliest_incomplete_instance_per_recurrence() {
        let recurrence_id = EntityId::new();
        let earliest = EntityId::new();
        let later = EntityId::new();
        let tasks = vec![
            task(later, Some(recurrence_id), Some("2026-08-01"), false),
            task(earliest, Some(recurrence_id), Some("2026-07-25"), false),
        ];

        let deduped = dedup_recurring(tasks);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].id, earliest);
    }

    #[test]
    fn dedup_drops_completed_instances_before_picking_the_earliest() {
        let recurrence_id = EntityId::new();
        let completed_earliest = EntityId::new();
        let incomplete_later = EntityId::new();
        let tasks = vec![
            task(completed_earliest, Some(recurrence_id), Some("2026-07-01"), true),
            task(incomplete_later, Some(recurrence_id), Some("2026-07-20"), false),
        ];

        let deduped = dedup_recurring(tasks);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].id, incomplete_later);
    }

    #[test]
    fn overlay_orders_known_ids_first_then_the_rest_by_insertion_order() {
        let a = EntityId::new();
        let b = EntityId::new();
        let c = EntityId::new();
        let tasks = vec![task(a, None, None, false), task(b, None, None, false), task(c, None, None, false)];

        let ordered = apply_overlay(tasks, &[c, a]);
        assert_eq!(ordered.iter().map(|t| t.id).collect::<Vec<_>>()[..2], [c, a]);
        assert_eq!(ordered[2].id, b);
    }
}
