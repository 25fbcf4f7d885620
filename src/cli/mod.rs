pub mod output;
pub mod watch;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use output::{print_json, print_table};
use tracing::{info, level_filters::LevelFilter};
use watch::{process_watch_command, WatchCommand};

use crate::{
    store::file::FileStore,
    tracker::Tracker,
    utils::{
        clock::{Clock, DefaultClock},
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, CLI_PREFIX, WATCH_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "worktally", version, long_about = None)]
#[command(about = "Track working time per project", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        env = "WORKTALLY_DIR",
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Enable logging to the console")]
    log: bool,
    #[arg(long = "log-filter", global = true)]
    log_filter: Option<LevelFilter>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Add a new stopped project at the end of the list")]
    Add { name: String },
    #[command(about = "Remove the project at the given index")]
    Remove { index: usize },
    #[command(about = "Start counting time for a project")]
    Start { index: usize },
    #[command(about = "Stop counting time for a project")]
    Stop { index: usize },
    #[command(about = "Stop a project and drop all of its time")]
    Reset { index: usize },
    #[command(about = "Show all projects and their time")]
    List {
        #[arg(long, help = "Print as JSON")]
        json: bool,
    },
    #[command(about = "Follow changes made by other instances")]
    Watch {
        #[command(flatten)]
        command: WatchCommand,
    },
}

pub async fn run_cli(args: Args) -> Result<()> {
    let app_dir = args
        .dir
        .map_or_else(create_application_default_path, ensure_dir)?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        args.log_filter
    };
    let prefix = match args.commands {
        Commands::Watch { .. } => WATCH_PREFIX,
        _ => CLI_PREFIX,
    };
    enable_logging(prefix, &app_dir, logging_level, args.log)?;

    let store_dir = app_dir.join("store");
    let store = FileStore::open(store_dir.clone())?;
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let mut tracker = Tracker::open(store, clock.clone())
        .await
        .with_context(|| format!("Can't load projects from {}", store_dir.display()))?;

    let found = match args.commands {
        Commands::Add { name } => {
            let index = tracker.add(name).await?;
            info!("Added project at {index}");
            true
        }
        Commands::Remove { index } => tracker.remove(index).await?,
        Commands::Start { index } => tracker.start(index).await?,
        Commands::Stop { index } => tracker.stop(index).await?,
        Commands::Reset { index } => tracker.reset(index).await?,
        Commands::List { json: true } => {
            return print_json(tracker.projects(), clock.millis());
        }
        Commands::List { json: false } => true,
        Commands::Watch { command } => {
            return process_watch_command(command, tracker, clock, &store_dir).await;
        }
    };

    if !found {
        println!("No project with that index, nothing changed.");
    }
    print_table(tracker.projects(), clock.millis());
    Ok(())
}
