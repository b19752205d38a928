use chrono::NaiveDate;
use taskcore_types::EntityId;

/// Identity of a view: one of the built-in filters, parameterized where
/// needed (§4.G). `canonical_name` is the string the View Layer uses to
/// look up a [`taskcore_types::ViewPreference`] overlay and the segment
/// the pipeline's `PUT /view-preferences/{view_key}` request carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewKey {
    Staging,
    Planned,
    Completed,
    Archived,
    Daily(NaiveDate),
    Area(EntityId),
    Project(EntityId, Option<EntityId>),
    Deadline,
}

impl ViewKey {
    pub fn canonical_name(&self) -> String {
        match self {
            ViewKey::Staging => "staging".to_string(),
            ViewKey::Planned => "planned".to_string(),
            ViewKey::Completed => "completed".to_string(),
            ViewKey::Archived => "archived".to_string(),
            ViewKey::Daily(date) => format!("daily:{date}"),
            ViewKey::Area(id) => format!("area:{id}"),
            ViewKey::Project(id, None) => format!("project:{id}"),
            ViewKey::Project(id, Some(section)) => format!("project:{id}:{section}"),
            ViewKey::Deadline => "deadline".to_string(),
        }
    }
}

impl std::fmt::Display for ViewKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical_name())
    }
}
