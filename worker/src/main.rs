use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use shared::{engine::Sha256d, store::zk::ZkStore, store::Store};
use tracing::*;
use worker::{config::WorkerConfig, machine::Miner, record::WorkerRecord};

#[derive(Parser, Debug)]
#[command(about, version)]
struct Args {
    /// Shard assignment from the batch launcher: "<startNonce>/<host:port>"
    #[arg(value_name = "ASSIGNMENT")]
    assignment: String,

    #[arg(long, value_name = "CONFIG_FILE", help = "JSON file with tuning overrides")]
    config: Option<String>,
}

fn main() -> anyhow::Result<()> {
    shared::log::init_log();

    let args = Args::parse();
    let (start_nonce, hosts) = parse_assignment(&args.assignment)?;
    let config = match &args.config {
        Some(path) => WorkerConfig::load(path).with_context(|| format!("loading {path}"))?,
        None => WorkerConfig::default(),
    };

    let started = Instant::now();
    let store = ZkStore::connect(&hosts, config.session_timeout())
        .context("cannot establish store session")?;
    let record = WorkerRecord::register(&store, start_nonce).context("registration failed")?;
    info!("worker {} starting, shard begins at {start_nonce}", record.path());

    let mut miner = Miner::new(&store, record, Sha256d::default(), config);
    let outcome = miner.run()?;

    // releasing the session is what removes our `active` marker
    if let Err(err) = store.close() {
        warn!("session close failed: {err}");
    }

    // (finalNonce, elapsedMillis) pair for the batch collector
    println!("{}\t{}", outcome.final_nonce, started.elapsed().as_millis());
    Ok(())
}

fn parse_assignment(raw: &str) -> anyhow::Result<(u64, String)> {
    let (nonce, hosts) =
        raw.split_once('/').context("assignment must be \"<startNonce>/<host:port>\"")?;
    let nonce = nonce.parse().with_context(|| format!("bad start nonce {nonce:?}"))?;
    Ok((nonce, hosts.to_string()))
}
