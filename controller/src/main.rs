mod publisher;
mod reaper;
mod report;

use std::{thread, time::Duration};

use anyhow::Context;
use clap::{Parser, Subcommand};
use shared::{problem::Problem, store::zk::ZkStore, store::Store};
use tracing::*;

#[derive(Parser, Debug)]
#[command(about, version)]
struct Args {
    #[arg(long, value_name = "HOST_PORT", help = "Coordination store address, e.g. localhost:2181")]
    hosts: String,

    #[arg(long, value_name = "TIMEOUT_MS", default_value_t = 5_000, help = "Store session timeout")]
    session_timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Publish a problem descriptor ("<headerHex>/<targetHex>") and
    /// bootstrap the workers root
    Initialize { problem: String },
    /// Remove the records of workers whose liveness marker is gone
    Cleanup {
        #[arg(long, value_name = "SECONDS", help = "Repeat the sweep on this period")]
        every: Option<u64>,
    },
    /// Delete the problem descriptor, signalling every worker to exit
    Shutdown,
    /// Print a summary of the round, including timing information
    Report,
}

fn main() -> anyhow::Result<()> {
    shared::log::init_log();

    let args = Args::parse();
    let store = ZkStore::connect(&args.hosts, Duration::from_millis(args.session_timeout))
        .context("cannot establish store session")?;

    match args.command {
        Command::Initialize { problem } => {
            let problem =
                Problem::parse(problem.as_bytes()).context("invalid problem descriptor")?;
            publisher::publish(&store, &problem)?;
        }
        Command::Cleanup { every: None } => {
            let stats = reaper::sweep(&store)?;
            info!("sweep done: {} workers scanned, {} reaped", stats.scanned, stats.reaped);
        }
        Command::Cleanup { every: Some(seconds) } => loop {
            let stats = reaper::sweep(&store)?;
            info!("sweep done: {} workers scanned, {} reaped", stats.scanned, stats.reaped);
            thread::sleep(Duration::from_secs(seconds));
        },
        Command::Shutdown => {
            if publisher::retract(&store)? {
                info!("problem descriptor deleted, workers will exit");
            } else {
                info!("problem descriptor was already gone");
            }
        }
        Command::Report => {
            let report = report::collect(&store)?;
            print!("{report}");
        }
    }

    if let Err(err) = store.close() {
        warn!("session close failed: {err}");
    }
    Ok(())
}
