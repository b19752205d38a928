//! Reference instruction implementations for the generic entity kinds of
//! the data model (§4.E). Embedders of this crate are free to register
//! their own instructions alongside or instead of these.

mod schedule;
mod task;
mod time_block;
mod view_preference;

use crate::registry::InstructionSet;
use std::sync::Arc;

pub use schedule::{ScheduleCreate, ScheduleDelete};
pub use task::{TaskComplete, TaskCreate, TaskDelete, TaskReopen, TaskUpdate};
pub use time_block::TimeBlockCreateFromTask;
pub use view_preference::ViewPreferenceApplySorting;

/// Register every built-in instruction under its conventional instruction
/// type name.
pub fn register_all(set: &mut InstructionSet) {
    set.register("task.create", Arc::new(TaskCreate));
    set.register("task.update", Arc::new(TaskUpdate));
    set.register("task.complete", Arc::new(TaskComplete));
    set.register("task.reopen", Arc::new(TaskReopen));
    set.register("task.delete", Arc::new(TaskDelete));
    set.register("schedule.create", Arc::new(ScheduleCreate));
    set.register("schedule.delete", Arc::new(ScheduleDelete));
    set.register("time_block.create_from_task", Arc::new(TimeBlockCreateFromTask));
    set.register("view_preference.apply_sorting", Arc::new(ViewPreferenceApplySorting));
}
