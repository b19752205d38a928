use crate::key::ViewKey;
use chrono::NaiveDate;
use taskcore_types::Task;

/// Whether `task` belongs to `view`, given `today` as the reference date
/// for schedule-relative views (§4.G). Every built-in filter implicitly
/// excludes deleted tasks; `archived`/`completed` are the only views that
/// admit archived/completed tasks at all.
pub fn matches(view: &ViewKey, task: &Task, today: NaiveDate) -> bool {
    if task.deleted {
        return false;
    }

    match view {
        ViewKey::Staging => !task.archived && !task.is_completed && !has_current_or_future_schedule(task, today),
        ViewKey::Planned => !task.archived && !task.is_completed && has_current_or_future_schedule(task, today),
        ViewKey::Completed => task.is_completed && !task.archived,
        ViewKey::Archived => task.archived,
        ViewKey::Daily(date) => !task.archived && !task.is_completed && task.scheduled_date == Some(*date),
        ViewKey::Area(area_id) => !task.archived && task.area_id == Some(*area_id),
        ViewKey::Project(project_id, section_id) => {
            !task.archived
                && task.project_id == Some(*project_id)
                && section_id.map(|s| task.section_id == Some(s)).unwrap_or(true)
        }
        ViewKey::Deadline => !task.archived && !task.is_completed && task.due_date.is_some(),
    }
}

fn has_current_or_future_schedule(task: &Task, today: NaiveDate) -> bool {
    task.scheduled_date.map(|d| d >= today).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskcore_types::EntityId;

    fn bare_task() -> Task {
        Task {
            id: EntityId::new(),
            title: "T".to_string(),
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
    fn staging_excludes_tasks_with_a_future_schedule() {
        let today = NaiveDate::from_ymd_opt(2026, 7, 26).unwrap();
        let mut task = bare_task();
        assert!(matches(&ViewKey::Staging, &task, today));

        task.scheduled_date = Some(today.succ_opt().unwrap());
        assert!(!matches(&ViewKey::Staging, &task, today));
    }

    #[test]
    fn planned_includes_tasks_scheduled_today() {
        let today = NaiveDate::from_ymd_opt(2026, 7, 26).unwrap();
        let mut task = bare_task();
        task.scheduled_date = Some(today);
        assert!(matches(&ViewKey::Planned, &task, today));
    }

    #[test]
    fn deleted_tasks_match_no_view() {
        let today = NaiveDate::from_ymd_opt(2026, 7, 26).unwrap();
        let mut task = bare_task();
        task.deleted = true;
        task.archived = true;
        assert!(!matches(&ViewKey::Archived, &task, today));
    }

    #[test]
    fn project_filter_respects_an_optional_section() {
        let today = NaiveDate::from_ymd_opt(2026, 7, 26).unwrap();
        let project_id = EntityId::new();
        let section_id = EntityId::new();
        let mut task = bare_task();
        task.project_id = Some(project_id);
        task.section_id = Some(section_id);

        assert!(matches(&ViewKey::Project(project_id, None), &task, today));
        assert!(matches(&ViewKey::Project(project_id, Some(section_id)), &task, today));
        assert!(!matches(&ViewKey::Project(project_id, Some(EntityId::new())), &task, today));
    }
}
