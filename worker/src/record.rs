//! The worker's record under `/workers`: one persistent-sequential parent
//! with four children. `active` is ephemeral and doubles as the liveness
//! marker; everything else survives until the reaper reclaims the record.

use shared::{
    errors::StoreResult,
    problem::Solution,
    store::{
        child_path, Mode, Store, ACTIVE, CURRENT_NONCE, INITIAL_NONCE, SOLUTION, WORKERS_PATH,
        WORKER_PREFIX,
    },
};
use tracing::debug;

pub struct WorkerRecord {
    path: String,
    initial_nonce: u64,
}

impl WorkerRecord {
    /// Create the record and its four children. Any failure here is fatal
    /// for the worker: without a place to report there is nothing to do.
    pub fn register<S: Store>(store: &S, initial_nonce: u64) -> StoreResult<Self> {
        let nonce = initial_nonce.to_string();
        let path =
            store.create(&format!("{WORKERS_PATH}/{WORKER_PREFIX}"), &[], Mode::PersistentSequential)?;
        store.create(&child_path(&path, INITIAL_NONCE), nonce.as_bytes(), Mode::Persistent)?;
        store.create(&child_path(&path, CURRENT_NONCE), nonce.as_bytes(), Mode::Persistent)?;
        store.create(&child_path(&path, SOLUTION), &[], Mode::Persistent)?;
        store.create(&child_path(&path, ACTIVE), &[], Mode::Ephemeral)?;
        debug!("registered as {path}");
        Ok(Self { path, initial_nonce })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn initial_nonce(&self) -> u64 {
        self.initial_nonce
    }

    /// Best-effort progress write. The record may have been reaped out from
    /// under us on a spurious liveness loss; skipping the write is fine,
    /// the local nonce counter stays authoritative.
    pub fn checkpoint<S: Store>(&self, store: &S, nonce: u64) -> StoreResult<()> {
        let path = child_path(&self.path, CURRENT_NONCE);
        if store.exists(&path)?.is_none() {
            debug!("{path} is gone, skipping checkpoint");
            return Ok(());
        }
        store.write(&path, nonce.to_string().as_bytes(), None)?;
        Ok(())
    }

    /// Publish a winning nonce. Recreates the node if it was reaped away.
    pub fn put_solution<S: Store>(&self, store: &S, solution: &Solution) -> StoreResult<()> {
        let path = child_path(&self.path, SOLUTION);
        let value = solution.encode();
        if store.exists(&path)?.is_none() {
            store.create(&path, value.as_bytes(), Mode::Persistent)?;
            return Ok(());
        }
        store.write(&path, value.as_bytes(), None)?;
        Ok(())
    }
}
