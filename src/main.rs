use anyhow::Result;
use clap::Parser;
use tracing::error;
use worktally::{
    cli::{run_cli, Args},
    utils::runtime::single_thread_runtime,
};

fn main() -> Result<()> {
    let args = Args::parse();
    single_thread_runtime()?.block_on(async move {
        run_cli(args).await.inspect_err(|e| {
            error!("Error running cli {e:?}");
        })
    })
}
