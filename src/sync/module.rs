use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace, warn};

use crate::{store::KeyValueStore, tracker::Tracker, utils::clock::Clock};

use super::SyncOutcome;

pub type SharedTracker<S> = Arc<Mutex<Tracker<S>>>;

/// Periodically runs [Tracker::sync]. Changes other than [SyncOutcome::Unchanged] are forwarded
/// to `reports` when one is given.
pub struct SyncModule<S> {
    tracker: SharedTracker<S>,
    reports: Option<mpsc::Sender<SyncOutcome>>,
    shutdown: CancellationToken,
    interval: Duration,
    time_provider: Arc<dyn Clock>,
}

impl<S: KeyValueStore + 'static> SyncModule<S> {
    pub fn new(
        tracker: SharedTracker<S>,
        shutdown: CancellationToken,
        interval: Duration,
        time_provider: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tracker,
            reports: None,
            shutdown,
            interval,
            time_provider,
        }
    }

    pub fn with_reports(self, reports: mpsc::Sender<SyncOutcome>) -> Self {
        Self {
            reports: Some(reports),
            ..self
        }
    }

    /// Executes the monitor loop until `shutdown` is cancelled. The first check happens one
    /// interval after the start, loading is [Tracker::open]'s job.
    pub async fn run(mut self) -> Result<()> {
        let mut tick_point = self.time_provider.instant();
        loop {
            tick_point += self.interval;

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.time_provider.sleep_until(tick_point) => ()
            }

            // Lock is held for the whole read-compare-replace so local commands can't interleave.
            let outcome = self.tracker.lock().await.sync().await;
            match outcome {
                Ok(SyncOutcome::Unchanged) => trace!("Store unchanged"),
                Ok(outcome) => {
                    info!("Sync finished with {outcome:?}");
                    self.report(outcome).await;
                }
                Err(e) => error!("Encountered an error during sync {e:?}"),
            }
        }
    }

    /// Runs the loop on the current runtime.
    pub fn spawn(self) -> MonitorHandle {
        let shutdown = self.shutdown.clone();
        let task = tokio::spawn(self.run());
        MonitorHandle { shutdown, task }
    }

    async fn report(&mut self, outcome: SyncOutcome) {
        let Some(reports) = self.reports.as_ref() else {
            return;
        };
        if reports.send(outcome).await.is_err() {
            warn!("Nobody listens to sync reports anymore");
            self.reports = None;
        }
    }
}

/// Start/stop handle for a spawned [SyncModule].
pub struct MonitorHandle {
    shutdown: CancellationToken,
    task: JoinHandle<Result<()>>,
}

impl MonitorHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancels the loop and waits for it to exit.
    pub async fn stop(self) -> Result<()> {
        self.shutdown.cancel();
        self.task.await?
    }
}
