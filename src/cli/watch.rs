use std::{path::Path, sync::Arc, time::Duration};

use anyhow::Result;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    store::KeyValueStore,
    sync::{module::SyncModule, SyncOutcome, DEFAULT_SYNC_INTERVAL},
    tracker::Tracker,
    utils::{clock::Clock, shutdown::detect_shutdown},
};

use super::output::print_table;

#[derive(Debug, clap::Args)]
pub struct WatchCommand {
    #[arg(
        long,
        short,
        default_value_t = DEFAULT_SYNC_INTERVAL.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Seconds between checks for changes made by other instances"
    )]
    interval: u64,
}

/// Keeps printing the project list as other instances change it, until Ctrl-C.
pub async fn process_watch_command<S: KeyValueStore + 'static>(
    WatchCommand { interval }: WatchCommand,
    mut tracker: Tracker<S>,
    clock: Arc<dyn Clock>,
    store_dir: &Path,
) -> Result<()> {
    let projects = tracker.projects_mut();
    projects
        .on_add()
        .subscribe(|project| info!("Project {:?} appeared", project.name()));
    projects
        .on_remove()
        .subscribe(|index| info!("Project at {index} went away"));

    println!(
        "Watching {} every {interval}s, Ctrl-C to stop.",
        store_dir.display()
    );
    print_table(tracker.projects(), clock.millis());

    let tracker = Arc::new(Mutex::new(tracker));
    let shutdown = CancellationToken::new();
    let (sender, mut receiver) = mpsc::channel::<SyncOutcome>(10);

    let handle = SyncModule::new(
        tracker.clone(),
        shutdown.clone(),
        Duration::from_secs(interval),
        clock.clone(),
    )
    .with_reports(sender)
    .spawn();

    // The receiver closes once the module exits and drops its sender.
    let printer = async {
        while let Some(outcome) = receiver.recv().await {
            let SyncOutcome::Replaced { rejected, .. } = outcome else {
                continue;
            };
            println!();
            for entry in rejected {
                println!("Skipped unreadable entry {}: {}", entry.index, entry.error);
            }
            print_table(tracker.lock().await.projects(), clock.millis());
        }
    };

    tokio::join!(detect_shutdown(shutdown.clone()), printer);

    handle.stop().await
}
