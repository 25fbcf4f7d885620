use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::{
    store::{KeyValueStore, StoreError},
    sync::{SyncMonitor, SyncOutcome},
    tracking::{list::ProjectList, project::Project},
    utils::clock::Clock,
};

/// The persistence side of the application. Owns the project list and writes it to the store
/// after every change made through it.
pub struct Tracker<S> {
    projects: ProjectList,
    monitor: SyncMonitor<S>,
    clock: Arc<dyn Clock>,
}

impl<S: KeyValueStore> Tracker<S> {
    /// Loads the current list from `store`. Any store error here is fatal: there is no mode that
    /// works without persistence.
    pub async fn open(store: S, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        Self::open_with(SyncMonitor::new(store, clock.clone()), clock).await
    }

    pub async fn open_with(
        mut monitor: SyncMonitor<S>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let mut projects = ProjectList::new();
        match monitor.load(&mut projects).await? {
            SyncOutcome::Replaced { rejected, .. } if !rejected.is_empty() => {
                warn!("Loaded with {} unreadable projects", rejected.len())
            }
            _ => (),
        }
        info!("Opened tracker with {} projects", projects.len());
        Ok(Self {
            projects,
            monitor,
            clock,
        })
    }

    pub fn projects(&self) -> &ProjectList {
        &self.projects
    }

    /// Gives access to subscriptions. Changes made here are not persisted until the next
    /// [Tracker::persist].
    pub fn projects_mut(&mut self) -> &mut ProjectList {
        &mut self.projects
    }

    pub fn monitor(&self) -> &SyncMonitor<S> {
        &self.monitor
    }

    /// Returns the index of the new project.
    #[instrument(skip(self, name))]
    pub async fn add(&mut self, name: impl Into<String>) -> Result<usize, StoreError> {
        self.projects.add(Project::new(name, self.clock.clone()));
        self.persist().await?;
        Ok(self.projects.len() - 1)
    }

    /// `false` when `index` is out of range. Nothing is written in that case.
    #[instrument(skip(self))]
    pub async fn remove(&mut self, index: usize) -> Result<bool, StoreError> {
        if index >= self.projects.len() {
            return Ok(false);
        }
        self.projects.remove(index);
        self.persist().await?;
        Ok(true)
    }

    pub async fn start(&mut self, index: usize) -> Result<bool, StoreError> {
        self.update(index, Project::start).await
    }

    pub async fn stop(&mut self, index: usize) -> Result<bool, StoreError> {
        self.update(index, Project::stop).await
    }

    pub async fn reset(&mut self, index: usize) -> Result<bool, StoreError> {
        self.update(index, Project::reset).await
    }

    /// One monitor tick against the store.
    pub async fn sync(&mut self) -> Result<SyncOutcome, StoreError> {
        self.monitor.tick(&mut self.projects).await
    }

    pub async fn persist(&mut self) -> Result<(), StoreError> {
        self.monitor.persist(&self.projects).await
    }

    async fn update(
        &mut self,
        index: usize,
        operation: impl FnOnce(&mut Project),
    ) -> Result<bool, StoreError> {
        let Some(project) = self.projects.get_mut(index) else {
            return Ok(false);
        };
        operation(project);
        self.persist().await?;
        Ok(true)
    }
}
