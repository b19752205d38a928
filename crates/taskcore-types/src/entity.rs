//! The generic entity kinds the Entity Store holds (§3).
//!
//! The pipeline itself never matches on these types — they exist so the
//! crate is a runnable, testable whole rather than a fully abstract core.
//! An embedder is free to add more kinds without touching the pipeline.

use crate::ids::EntityId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The discriminant used to select a collection inside the Entity Store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Task,
    TimeBlock,
    Area,
    Project,
    ProjectSection,
    Template,
    Recurrence,
    ViewPreference,
    Setting,
}

impl EntityKind {
    pub const ALL: [EntityKind; 9] = [
        EntityKind::Task,
        EntityKind::TimeBlock,
        EntityKind::Area,
        EntityKind::Project,
        EntityKind::ProjectSection,
        EntityKind::Template,
        EntityKind::Recurrence,
        EntityKind::ViewPreference,
        EntityKind::Setting,
    ];

    /// The wire name used as a `side_effects` map key (§6) and as the
    /// `Record`'s serde tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Task => "task",
            EntityKind::TimeBlock => "time_block",
            EntityKind::Area => "area",
            EntityKind::Project => "project",
            EntityKind::ProjectSection => "project_section",
            EntityKind::Template => "template",
            EntityKind::Recurrence => "recurrence",
            EntityKind::ViewPreference => "view_preference",
            EntityKind::Setting => "setting",
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown entity kind '{s}'"))
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: EntityId,
    pub title: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub deleted: bool,
    pub due_date: Option<NaiveDate>,
    pub scheduled_date: Option<NaiveDate>,
    pub area_id: Option<EntityId>,
    pub project_id: Option<EntityId>,
    pub section_id: Option<EntityId>,
    pub recurrence_id: Option<EntityId>,
    /// The date this instance was originally generated for, used by the
    /// recurring-task dedup rule (§4.G). Lexicographic ISO-8601 ordering
    /// doubles as chronological ordering.
    pub recurrence_original_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBlock {
    pub id: EntityId,
    pub task_id: Option<EntityId>,
    pub date: NaiveDate,
    pub start_minute: u32,
    pub duration_minutes: u32,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: EntityId,
    pub name: String,
    pub area_id: Option<EntityId>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSection {
    pub id: EntityId,
    pub project_id: EntityId,
    pub name: String,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: EntityId,
    pub name: String,
    pub payload: serde_json::Value,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recurrence {
    pub id: EntityId,
    pub rule: String,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewPreference {
    pub id: EntityId,
    pub view_key: String,
    pub ordered_ids: Vec<EntityId>,
    #[serde(default)]
    pub deleted: bool,
}

impl ViewPreference {
    pub fn new(view_key: impl Into<String>, ordered_ids: Vec<EntityId>) -> Self {
        let view_key = view_key.into();
        Self {
            id: EntityId::from_name("view_preference", &view_key),
            view_key,
            ordered_ids,
            deleted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    pub id: EntityId,
    pub key: String,
    pub value: serde_json::Value,
    #[serde(default)]
    pub deleted: bool,
}

/// A tagged union of every concrete record kind, used wherever the
/// pipeline needs to move a record opaquely (store writes, envelopes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Task(Task),
    TimeBlock(TimeBlock),
    Area(Area),
    Project(Project),
    ProjectSection(ProjectSection),
    Template(Template),
    Recurrence(Recurrence),
    ViewPreference(ViewPreference),
    Setting(Setting),
}

impl Record {
    pub fn id(&self) -> EntityId {
        match self {
            Record::Task(r) => r.id,
            Record::TimeBlock(r) => r.id,
            Record::Area(r) => r.id,
            Record::Project(r) => r.id,
            Record::ProjectSection(r) => r.id,
            Record::Template(r) => r.id,
            Record::Recurrence(r) => r.id,
            Record::ViewPreference(r) => r.id,
            Record::Setting(r) => r.id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Task(_) => EntityKind::Task,
            Record::TimeBlock(_) => EntityKind::TimeBlock,
            Record::Area(_) => EntityKind::Area,
            Record::Project(_) => EntityKind::Project,
            Record::ProjectSection(_) => EntityKind::ProjectSection,
            Record::Template(_) => EntityKind::Template,
            Record::Recurrence(_) => EntityKind::Recurrence,
            Record::ViewPreference(_) => EntityKind::ViewPreference,
            Record::Setting(_) => EntityKind::Setting,
        }
    }

    /// Soft-delete flag, monotonic per I2. Kinds without a `deleted` field
    /// (none currently) would report `false` here.
    pub fn is_deleted(&self) -> bool {
        match self {
            Record::Task(r) => r.deleted,
            Record::TimeBlock(r) => r.deleted,
            Record::Area(r) => r.deleted,
            Record::Project(r) => r.deleted,
            Record::ProjectSection(r) => r.deleted,
            Record::Template(r) => r.deleted,
            Record::Recurrence(r) => r.deleted,
            Record::ViewPreference(r) => r.deleted,
            Record::Setting(r) => r.deleted,
        }
    }

    pub fn as_task(&self) -> Option<&Task> {
        match self {
            Record::Task(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_time_block(&self) -> Option<&TimeBlock> {
        match self {
            Record::TimeBlock(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_view_preference(&self) -> Option<&ViewPreference> {
        match self {
            Record::ViewPreference(v) => Some(v),
            _ => None,
        }
    }
}

/// A group of side-effect mutations for one entity kind within a
/// [`crate::envelope::TransactionEnvelope`] (§3, §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SideEffectGroup {
    #[serde(default)]
    pub added_or_updated: Vec<Record>,
    #[serde(default)]
    pub removed: Vec<EntityId>,
}

/// Wire-level side effects, keyed by [`EntityKind::as_str`]. A plain
/// `String` key (rather than `EntityKind` itself) sidesteps enum-as-map-key
/// derive ambiguity and matches how the teacher's envelope types key
/// collections by their string name.
pub type SideEffects = HashMap<String, SideEffectGroup>;
