//! Full state-machine runs against the in-process store backend: workers in
//! their own threads with their own sessions, publisher and observer on the
//! main thread.

use std::{
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use shared::{
    engine::{meets_target, Engine, Pow, Sha256d, DIGEST_LEN},
    problem::{Problem, Solution},
    store::{
        child_path,
        memory::{MemorySession, MemoryStore},
        Mode, Store, ACTIVE, CONFIG_PATH, CURRENT_NONCE, SOLUTION, WORKERS_PATH,
    },
};
use worker::{config::WorkerConfig, machine::Miner, record::WorkerRecord};

/// Deterministic engine: exactly one (header, nonce) pair produces a digest
/// below a mid-range target; every other candidate lands above it. The
/// winning digest carries the header's first byte so a solution can be
/// traced to the epoch it was computed in.
#[derive(Clone)]
struct ScriptedEngine {
    win_header: Vec<u8>,
    win_nonce: u64,
    header: Vec<u8>,
}

impl ScriptedEngine {
    fn new(win_header: &[u8], win_nonce: u64) -> Self {
        Self { win_header: win_header.to_vec(), win_nonce, header: Vec::new() }
    }

    fn winning_digest(header: &[u8]) -> Pow {
        let mut digest = [0u8; DIGEST_LEN];
        digest[1] = header.first().copied().unwrap_or(0);
        digest
    }
}

impl Engine for ScriptedEngine {
    fn reseed(&mut self, header: &[u8]) {
        self.header = header.to_vec();
    }

    fn search_step(&mut self, nonce: u64) -> Pow {
        if self.header == self.win_header && nonce == self.win_nonce {
            Self::winning_digest(&self.header)
        } else {
            [0xff; DIGEST_LEN]
        }
    }
}

const MID_TARGET: Pow = [0x80; DIGEST_LEN];

fn test_config() -> WorkerConfig {
    WorkerConfig {
        batch_iterations: 50,
        idle_interval_ms: 5,
        backoff_base_ms: 1,
        ..WorkerConfig::default()
    }
}

fn publish(store: &MemoryStore, problem: &Problem) {
    let session = store.session();
    if session.exists(WORKERS_PATH).unwrap().is_none() {
        session.create(WORKERS_PATH, &[], Mode::Persistent).unwrap();
    }
    let value = problem.encode();
    match session.exists(CONFIG_PATH).unwrap() {
        Some(_) => {
            session.write(CONFIG_PATH, value.as_bytes(), None).unwrap();
        }
        None => {
            session.create(CONFIG_PATH, value.as_bytes(), Mode::Persistent).unwrap();
        }
    }
}

fn retract(store: &MemoryStore) {
    store.session().delete(CONFIG_PATH, None).unwrap();
}

fn spawn_worker<E: Engine + Send + 'static>(
    store: &MemoryStore,
    start_nonce: u64,
    engine: E,
    config: WorkerConfig,
) -> (String, JoinHandle<worker::machine::Outcome>) {
    let session: MemorySession = store.session();
    let record = WorkerRecord::register(&session, start_nonce).unwrap();
    let path = record.path().to_string();
    let handle = thread::spawn(move || {
        let mut miner = Miner::new(&session, record, engine, config);
        let outcome = miner.run().unwrap();
        session.close().unwrap();
        outcome
    });
    (path, handle)
}

fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(2));
    }
}

fn read_solution(store: &MemoryStore, record_path: &str) -> Option<Solution> {
    let (value, _) = store.session().read(&child_path(record_path, SOLUTION)).ok()?;
    if value.is_empty() {
        return None;
    }
    Some(Solution::parse(&value).unwrap())
}

fn read_current_nonce(store: &MemoryStore, record_path: &str) -> u64 {
    let (value, _) = store.session().read(&child_path(record_path, CURRENT_NONCE)).unwrap();
    String::from_utf8(value).unwrap().parse().unwrap()
}

#[test]
fn single_worker_solves_trivial_target() {
    let store = MemoryStore::new();
    let header = vec![0x01, 0x00, 0xab, 0xcd];
    let problem = Problem { header: header.clone(), target: [0xff; DIGEST_LEN] };
    publish(&store, &problem);

    let (path, handle) = spawn_worker(&store, 0, Sha256d::default(), test_config());
    wait_until("solution", || read_solution(&store, &path).is_some());

    let solution = read_solution(&store, &path).unwrap();
    // increment-then-hash: the first candidate above shard start 0 is 1
    assert_eq!(solution.nonce, 1);
    assert!(meets_target(&solution.digest, &problem.target));
    assert_eq!(solution.digest, Sha256d::new(&header).search_step(1));
    // the winning nonce is checkpointed right after the solution lands
    wait_until("winning checkpoint", || read_current_nonce(&store, &path) == 1);

    retract(&store);
    let outcome = handle.join().unwrap();
    assert!(outcome.solved);
    assert_eq!(outcome.final_nonce, 1);
    // the session is released, so the liveness marker is gone
    assert!(store.session().exists(&child_path(&path, ACTIVE)).unwrap().is_none());
}

#[test]
fn only_the_shard_owning_the_solution_reports_it() {
    let store = MemoryStore::new();
    let header = vec![0x0a];
    publish(&store, &Problem { header: header.clone(), target: MID_TARGET });

    // the sole qualifying nonce sits inside the second worker's shard; the
    // first worker would need many more batches to ever reach it
    let engine = ScriptedEngine::new(&header, 1100);
    let (path_a, handle_a) = spawn_worker(&store, 0, engine.clone(), test_config());
    let (path_b, handle_b) = spawn_worker(&store, 1000, engine, test_config());

    wait_until("second worker's solution", || read_solution(&store, &path_b).is_some());
    assert!(read_solution(&store, &path_a).is_none());
    retract(&store);

    let outcome_a = handle_a.join().unwrap();
    let outcome_b = handle_b.join().unwrap();
    assert!(!outcome_a.solved);
    assert!(outcome_b.solved);
    assert_eq!(read_solution(&store, &path_b).unwrap().nonce, 1100);
}

#[test]
fn header_change_resets_the_shard_and_solutions_follow_the_new_epoch() {
    let store = MemoryStore::new();
    let old_header = vec![0x01];
    let new_header = vec![0x02];
    publish(&store, &Problem { header: old_header, target: MID_TARGET });

    // nothing qualifies under the old header; nonce 5 wins under the new one
    let engine = ScriptedEngine::new(&new_header, 5);
    let (path, handle) = spawn_worker(&store, 0, engine, test_config());

    // let the worker checkpoint some distance into the old epoch first
    wait_until("progress under the old header", || read_current_nonce(&store, &path) >= 150);

    publish(&store, &Problem { header: new_header.clone(), target: MID_TARGET });
    wait_until("solution", || read_solution(&store, &path).is_some());

    let solution = read_solution(&store, &path).unwrap();
    assert_eq!(solution.nonce, 5, "search restarted from the shard start");
    assert_eq!(solution.digest, ScriptedEngine::winning_digest(&new_header));
    // the checkpoint went backwards with the reset
    wait_until("reset checkpoint", || read_current_nonce(&store, &path) == 5);

    retract(&store);
    assert!(handle.join().unwrap().solved);
}

#[test]
fn retraction_shuts_a_searching_worker_down() {
    let store = MemoryStore::new();
    let header = vec![0x07];
    publish(&store, &Problem { header: header.clone(), target: MID_TARGET });

    // unsolvable: the winning pair belongs to a header never published
    let engine = ScriptedEngine::new(&[0xee], 10);
    let (path, handle) = spawn_worker(&store, 0, engine, test_config());
    wait_until("first checkpoint", || read_current_nonce(&store, &path) >= 50);

    retract(&store);
    let outcome = handle.join().unwrap();
    assert!(!outcome.solved);
    assert!(outcome.final_nonce >= 50);
    assert!(store.session().exists(&child_path(&path, ACTIVE)).unwrap().is_none());
    // persisted state stays behind for the reaper
    assert!(store.session().exists(&path).unwrap().is_some());
}
