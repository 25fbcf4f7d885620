use ansi_term::{Colour, Style};
use chrono::{DateTime, Local};
use serde::Serialize;

use crate::{
    tracking::{
        list::ProjectList,
        project::{Project, ProjectState},
    },
    utils::time::{format_elapsed, local_from_millis},
};

/// What `list --json` prints for one project.
#[derive(Debug, Serialize)]
pub struct ProjectView<'a> {
    pub index: usize,
    pub name: &'a str,
    pub state: ProjectState,
    pub accumulated_ms: u64,
    pub running_since: Option<DateTime<Local>>,
    pub time_spent_ms: u64,
}

impl<'a> ProjectView<'a> {
    pub fn new(index: usize, project: &'a Project, now: i64) -> Self {
        Self {
            index,
            name: project.name(),
            state: project.state(),
            accumulated_ms: project.accumulated_ms(),
            running_since: project
                .is_running()
                .then(|| local_from_millis(project.iteration_start()))
                .flatten(),
            time_spent_ms: project.time_spent_at(now),
        }
    }
}

/// One line per project: `index  state  time  name`. Every project is measured against the same
/// `now` so rows stay comparable.
pub fn render_rows(list: &ProjectList, now: i64, colored: bool) -> Vec<String> {
    let mut rows = Vec::with_capacity(list.len());
    list.for_each(|project, index, _| {
        let state = format!("{:<7}", project.state());
        let state = match (colored, project.state()) {
            (false, _) => state,
            (true, ProjectState::Running) => Colour::Green.bold().paint(state).to_string(),
            (true, ProjectState::Stopped) => Style::new().dimmed().paint(state).to_string(),
        };
        let since = match ProjectView::new(index, project, now).running_since {
            Some(since) => format!(" (since {})", since.format("%H:%M")),
            None => String::new(),
        };
        rows.push(format!(
            "{index:>3}  {state}  {:>9}  {}{since}",
            format_elapsed(project.time_spent_at(now)),
            project.name(),
        ));
    });
    rows
}

pub fn print_table(list: &ProjectList, now: i64) {
    if list.is_empty() {
        println!("No projects yet. Add one with `worktally add <name>`.");
        return;
    }
    for row in render_rows(list, now, true) {
        println!("{row}");
    }
}

pub fn print_json(list: &ProjectList, now: i64) -> anyhow::Result<()> {
    let views = list
        .iter()
        .enumerate()
        .map(|(index, project)| ProjectView::new(index, project, now))
        .collect::<Vec<_>>();
    println!("{}", serde_json::to_string_pretty(&views)?);
    Ok(())
}
