//! Keeps an instance consistent with a store other instances write to.
//!
//! The protocol is deliberately coarse: every tick reads the stored snapshot and compares it with
//! the last snapshot this instance wrote or loaded. Any difference replaces the whole in-memory
//! list. Local changes that weren't persisted yet are lost in that case.

pub mod module;

use std::{sync::Arc, time::Duration};

use tracing::{debug, info, instrument};

use crate::{
    store::{KeyValueStore, StoreError},
    tracking::{
        codec::{decode_list, encode_list, RejectedEntry},
        list::ProjectList,
    },
    utils::clock::Clock,
};

/// Key the whole project list is stored under.
pub const PROJECTS_KEY: &str = "projects";

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The store holds exactly what this instance last wrote or loaded.
    Unchanged,
    /// Nothing is stored yet.
    Absent,
    /// The list was rebuilt from the stored snapshot.
    Replaced {
        projects: usize,
        rejected: Vec<RejectedEntry>,
    },
}

pub struct SyncMonitor<S> {
    store: S,
    key: String,
    last_written: Option<String>,
    clock: Arc<dyn Clock>,
}

impl<S: KeyValueStore> SyncMonitor<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            key: PROJECTS_KEY.into(),
            last_written: None,
            clock,
        }
    }

    pub fn with_key(self, key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..self
        }
    }

    /// Snapshot this instance last wrote or loaded.
    pub fn last_written(&self) -> Option<&str> {
        self.last_written.as_deref()
    }

    /// Initial read. An absent value leaves `list` empty.
    pub async fn load(&mut self, list: &mut ProjectList) -> Result<SyncOutcome, StoreError> {
        match self.store.read(&self.key).await? {
            Some(snapshot) => Ok(self.apply(snapshot, list)),
            None => {
                list.replace_all(Vec::new());
                self.last_written = None;
                Ok(SyncOutcome::Absent)
            }
        }
    }

    /// Writes the whole list and remembers it as the snapshot to compare against.
    pub async fn persist(&mut self, list: &ProjectList) -> Result<(), StoreError> {
        let snapshot = encode_list(list);
        self.store.write(&self.key, &snapshot).await?;
        debug!("Persisted {} projects", list.len());
        self.last_written = Some(snapshot);
        Ok(())
    }

    #[instrument(skip_all)]
    pub async fn tick(&mut self, list: &mut ProjectList) -> Result<SyncOutcome, StoreError> {
        let Some(snapshot) = self.store.read(&self.key).await? else {
            debug!("Nothing stored under {}", self.key);
            return Ok(SyncOutcome::Absent);
        };
        if self.last_written.as_deref() == Some(snapshot.as_str()) {
            return Ok(SyncOutcome::Unchanged);
        }
        info!("Store was changed by another instance, reloading");
        Ok(self.apply(snapshot, list))
    }

    fn apply(&mut self, snapshot: String, list: &mut ProjectList) -> SyncOutcome {
        let decoded = decode_list(&snapshot, &self.clock);
        let projects = decoded.projects.len();
        list.replace_all(decoded.projects);
        self.last_written = Some(snapshot);
        SyncOutcome::Replaced {
            projects,
            rejected: decoded.rejected,
        }
    }
}
