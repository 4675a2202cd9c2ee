//! Read-only summary of a mining round: the current problem, and per worker
//! its liveness, shard start, solution, and a throughput figure derived
//! from the store's own node timestamps.

use std::fmt::{self, Display, Formatter};

use shared::{
    errors::StoreResult,
    problem::{Problem, Solution},
    store::{child_path, Store, ACTIVE, CONFIG_PATH, CURRENT_NONCE, INITIAL_NONCE, SOLUTION, WORKERS_PATH},
};
use tracing::warn;

#[derive(Debug)]
pub struct WorkerStatus {
    pub name: String,
    pub alive: bool,
    pub initial_nonce: Option<u64>,
    pub current_nonce: Option<u64>,
    pub solution: Option<Solution>,
    /// `(current − initial) × 1000 / (mtime − ctime)` of the progress node;
    /// absent when the elapsed time is zero or the nonces are unavailable.
    pub trials_per_sec: Option<f64>,
}

#[derive(Debug)]
pub struct Report {
    pub problem: Option<Problem>,
    pub workers: Vec<WorkerStatus>,
}

pub fn collect<S: Store>(store: &S) -> StoreResult<Report> {
    let problem = match store.read(CONFIG_PATH) {
        Ok((value, _)) => match Problem::parse(&value) {
            Ok(problem) => Some(problem),
            Err(err) => {
                warn!("unreadable problem descriptor: {err}");
                None
            }
        },
        Err(err) if err.is_not_found() => None,
        Err(err) => return Err(err),
    };

    let names = match store.children(WORKERS_PATH) {
        Ok(names) => names,
        Err(err) if err.is_not_found() => Vec::new(),
        Err(err) => return Err(err),
    };

    let mut workers = Vec::with_capacity(names.len());
    for name in names {
        workers.push(worker_status(store, name)?);
    }
    Ok(Report { problem, workers })
}

fn worker_status<S: Store>(store: &S, name: String) -> StoreResult<WorkerStatus> {
    let record = format!("{WORKERS_PATH}/{name}");
    let alive = store.exists(&child_path(&record, ACTIVE))?.is_some();
    let initial_nonce = read_nonce(store, &child_path(&record, INITIAL_NONCE))?;

    let mut current_nonce = None;
    let mut trials_per_sec = None;
    if let Some((value, meta)) = read_optional(store, &child_path(&record, CURRENT_NONCE))? {
        current_nonce = parse_nonce(&value);
        if let (Some(initial), Some(current)) = (initial_nonce, current_nonce) {
            let elapsed_ms = meta.modified_ms - meta.created_ms;
            if elapsed_ms > 0 {
                trials_per_sec =
                    Some((current.saturating_sub(initial)) as f64 * 1000.0 / elapsed_ms as f64);
            }
        }
    }

    let solution = match read_optional(store, &child_path(&record, SOLUTION))? {
        Some((value, _)) if !value.is_empty() => match Solution::parse(&value) {
            Ok(solution) => Some(solution),
            Err(err) => {
                warn!("unreadable solution for {record}: {err}");
                None
            }
        },
        _ => None,
    };

    Ok(WorkerStatus { name, alive, initial_nonce, current_nonce, solution, trials_per_sec })
}

fn read_optional<S: Store>(
    store: &S,
    path: &str,
) -> StoreResult<Option<(Vec<u8>, shared::store::Meta)>> {
    match store.read(path) {
        Ok(found) => Ok(Some(found)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

fn read_nonce<S: Store>(store: &S, path: &str) -> StoreResult<Option<u64>> {
    Ok(read_optional(store, path)?.and_then(|(value, _)| parse_nonce(&value)))
}

fn parse_nonce(value: &[u8]) -> Option<u64> {
    std::str::from_utf8(value).ok()?.parse().ok()
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.problem {
            Some(problem) => writeln!(f, "Config: {}", problem.encode())?,
            None => writeln!(f, "Config: not found (system has been shut down)")?,
        }
        for worker in &self.workers {
            let marker = if worker.alive { '*' } else { ' ' };
            let start = match worker.initial_nonce {
                Some(nonce) => nonce.to_string(),
                None => "not available".to_string(),
            };
            writeln!(f, "{marker} {WORKERS_PATH}/{} ({start})", worker.name)?;
            if let Some(solution) = &worker.solution {
                writeln!(f, "     solution: {}", solution.encode())?;
            }
            if let Some(rate) = worker.trials_per_sec {
                writeln!(f, "     {rate:.2} trials/sec")?;
            }
        }
        Ok(())
    }
}
