use std::{fmt, str::FromStr, sync::Arc};

use serde::Serialize;
use tracing::debug;

use crate::utils::clock::Clock;

use super::{
    codec::{self, CodecError},
    events::Subscribers,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectState {
    Stopped,
    Running,
}

impl ProjectState {
    /// Tag used by the text format.
    pub fn as_tag(self) -> &'static str {
        match self {
            ProjectState::Stopped => "stopped",
            ProjectState::Running => "running",
        }
    }
}

impl fmt::Display for ProjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_tag())
    }
}

impl FromStr for ProjectState {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stopped" => Ok(ProjectState::Stopped),
            "running" => Ok(ProjectState::Running),
            other => Err(CodecError::MalformedState(other.into())),
        }
    }
}

/// What a project reports to its `on_change` subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectChange {
    Started,
    Stopped,
    Reset,
}

/// A single time tracked project.
///
/// Time spent is `accumulated + (now - iteration_start)` while running and `accumulated` while
/// stopped. Reading it never touches the stored fields.
pub struct Project {
    name: String,
    state: ProjectState,
    accumulated_ms: u64,
    iteration_start: i64,
    clock: Arc<dyn Clock>,
    on_change: Subscribers<ProjectChange>,
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("accumulated_ms", &self.accumulated_ms)
            .field("iteration_start", &self.iteration_start)
            .finish()
    }
}

impl Project {
    pub fn new(name: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self::restore(name, ProjectState::Stopped, 0, 0, clock)
    }

    /// Builds a project from previously stored fields, exactly as given.
    pub fn restore(
        name: impl Into<String>,
        state: ProjectState,
        accumulated_ms: u64,
        iteration_start: i64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name: name.into(),
            state,
            accumulated_ms,
            iteration_start,
            clock,
            on_change: Subscribers::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ProjectState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ProjectState::Running
    }

    /// Milliseconds spent in iterations that already finished.
    pub fn accumulated_ms(&self) -> u64 {
        self.accumulated_ms
    }

    /// Epoch milliseconds when the current iteration started, `0` while stopped.
    pub fn iteration_start(&self) -> i64 {
        self.iteration_start
    }

    pub fn on_change(&mut self) -> &mut Subscribers<ProjectChange> {
        &mut self.on_change
    }

    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        self.state = ProjectState::Running;
        self.iteration_start = self.clock.millis();
        debug!("Started {:?} at {}", self.name, self.iteration_start);
        self.on_change.emit(&ProjectChange::Started);
    }

    pub fn stop(&mut self) {
        if !self.is_running() {
            return;
        }
        self.accumulated_ms = self
            .accumulated_ms
            .saturating_add(self.running_ms(self.clock.millis()));
        self.iteration_start = 0;
        self.state = ProjectState::Stopped;
        debug!("Stopped {:?} with {}ms", self.name, self.accumulated_ms);
        self.on_change.emit(&ProjectChange::Stopped);
    }

    /// Stops the project and forgets all of its time. A running project notifies twice, first for
    /// the stop and then for the reset.
    pub fn reset(&mut self) {
        self.stop();
        self.accumulated_ms = 0;
        self.on_change.emit(&ProjectChange::Reset);
    }

    pub fn time_spent(&self) -> u64 {
        self.time_spent_at(self.clock.millis())
    }

    /// Time spent as of `now`, in epoch milliseconds.
    pub fn time_spent_at(&self, now: i64) -> u64 {
        self.accumulated_ms.saturating_add(self.running_ms(now))
    }

    pub fn serialize(&self) -> String {
        codec::encode_project(self)
    }

    /// Overwrites the stored fields with the ones from `text`. Subscriptions survive and no
    /// change is reported. On error the project is left untouched.
    pub fn deserialize(&mut self, text: &str) -> Result<(), CodecError> {
        let fields = codec::decode_fields(text)?;
        self.name = fields.name;
        self.state = fields.state;
        self.accumulated_ms = fields.accumulated_ms;
        self.iteration_start = fields.iteration_start;
        Ok(())
    }

    // Another instance may have a clock slightly ahead of ours.
    fn running_ms(&self, now: i64) -> u64 {
        match self.state {
            ProjectState::Running => now
                .checked_sub(self.iteration_start)
                .and_then(|elapsed| u64::try_from(elapsed).ok())
                .unwrap_or(0),
            ProjectState::Stopped => 0,
        }
    }
}
