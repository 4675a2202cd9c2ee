//! The per-worker search state machine:
//! `SEARCHING ⇄ IDLE_AFTER_SOLUTION → SHUT_DOWN`. Registration happens
//! before the machine starts and is fatal on failure.
//!
//! Purely polling: the descriptor is re-read once per cycle (one search
//! batch, or one idle sleep), which bounds both staleness and store load.

use std::thread;

use shared::{
    engine::{meets_target, Engine},
    errors::{FormatError, StoreError},
    problem::{Problem, Solution},
    store::{Store, CONFIG_PATH},
};
use thiserror::Error;
use tracing::{info, warn};

use crate::{config::WorkerConfig, record::WorkerRecord};

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("store failure: {0}")]
    Store(#[from] StoreError),
    #[error("bad persisted value: {0}")]
    Format(#[from] FormatError),
    #[error("store unreachable after {0} consecutive attempts")]
    StoreUnavailable(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Searching,
    IdleAfterSolution,
}

#[derive(Debug, Clone, Copy)]
pub struct Outcome {
    pub final_nonce: u64,
    pub solved: bool,
}

pub struct Miner<'a, S: Store, E: Engine> {
    store: &'a S,
    record: WorkerRecord,
    engine: E,
    config: WorkerConfig,
    failures: u32,
}

impl<'a, S: Store, E: Engine> Miner<'a, S, E> {
    pub fn new(store: &'a S, record: WorkerRecord, engine: E, config: WorkerConfig) -> Self {
        Self { store, record, engine, config, failures: 0 }
    }

    /// Drive the machine until the problem descriptor disappears. Returns
    /// the last nonce reached so the caller can hand it to the batch
    /// collector.
    pub fn run(&mut self) -> Result<Outcome, WorkerError> {
        let mut problem = match self.poll_problem()? {
            Some(problem) => problem,
            None => {
                info!("no problem published, shutting down");
                return Ok(Outcome { final_nonce: self.record.initial_nonce(), solved: false });
            }
        };
        self.engine.reseed(&problem.header);

        let mut nonce = self.record.initial_nonce();
        let mut state = State::Searching;

        loop {
            match state {
                State::Searching => {
                    if let Some(solution) = self.search_batch(&problem, &mut nonce) {
                        self.report_solution(&solution)?;
                        state = State::IdleAfterSolution;
                    }
                }
                State::IdleAfterSolution => thread::sleep(self.config.idle_interval()),
            }

            match self.poll_problem()? {
                None => {
                    info!("problem retracted, shutting down at nonce {nonce}");
                    return Ok(Outcome {
                        final_nonce: nonce,
                        solved: state == State::IdleAfterSolution,
                    });
                }
                Some(next) => {
                    // a changed header invalidates everything from the old
                    // epoch, solution or not
                    if next.header != problem.header {
                        info!("new problem, resetting to nonce {}", self.record.initial_nonce());
                        self.engine.reseed(&next.header);
                        nonce = self.record.initial_nonce();
                        problem = next;
                        state = State::Searching;
                    }
                }
            }

            if state == State::Searching {
                if let Err(err) = self.record.checkpoint(self.store, nonce) {
                    self.note_failure(err)?;
                } else {
                    self.failures = 0;
                }
            }
        }
    }

    /// One bounded batch of hashing. Never suspends.
    fn search_batch(&mut self, problem: &Problem, nonce: &mut u64) -> Option<Solution> {
        for _ in 0..self.config.batch_iterations {
            *nonce += 1;
            let digest = self.engine.search_step(*nonce);
            if meets_target(&digest, &problem.target) {
                return Some(Solution { digest, nonce: *nonce });
            }
        }
        None
    }

    /// Read the descriptor. Absence is the shutdown signal, not an error;
    /// transient failures retry with backoff up to the configured bound.
    fn poll_problem(&mut self) -> Result<Option<Problem>, WorkerError> {
        loop {
            match self.store.read(CONFIG_PATH) {
                Ok((value, _)) => {
                    self.failures = 0;
                    return Ok(Some(Problem::parse(&value)?));
                }
                Err(err) if err.is_not_found() => {
                    self.failures = 0;
                    return Ok(None);
                }
                Err(err) => self.note_failure(err)?,
            }
        }
    }

    /// A worker that cannot report its win has no reason to keep running,
    /// so exhausting retries here is fatal.
    fn report_solution(&mut self, solution: &Solution) -> Result<(), WorkerError> {
        loop {
            match self.record.put_solution(self.store, solution) {
                Ok(()) => break,
                Err(err) => self.note_failure(err)?,
            }
        }
        loop {
            match self.record.checkpoint(self.store, solution.nonce) {
                Ok(()) => break,
                Err(err) => self.note_failure(err)?,
            }
        }
        self.failures = 0;
        info!("solution found: {}", solution.encode());
        Ok(())
    }

    fn note_failure(&mut self, err: StoreError) -> Result<(), WorkerError> {
        self.failures += 1;
        if self.failures >= self.config.max_consecutive_failures {
            return Err(WorkerError::StoreUnavailable(self.failures));
        }
        let delay = self.config.backoff(self.failures);
        warn!("store failure ({err}), attempt {} of {}, backing off {delay:?}",
            self.failures, self.config.max_consecutive_failures);
        thread::sleep(delay);
        Ok(())
    }
}
