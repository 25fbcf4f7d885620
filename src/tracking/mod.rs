//! The in-memory model: [project::Project] accounts for time, [list::ProjectList] orders projects
//! and reports additions and removals, [codec] turns both into the stored text.

pub mod codec;
pub mod events;
pub mod list;
pub mod project;
