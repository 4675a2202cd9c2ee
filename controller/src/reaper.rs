//! Reclaims the records of dead workers. The `active` child is ephemeral
//! and tied to the worker's session, so its absence is the only liveness
//! test needed. Deletion runs child-then-parent so nobody ever observes a
//! half-deleted record with surviving metadata, and every delete tolerates
//! "already gone" so concurrent sweeps are safe.

use shared::{
    errors::{StoreError, StoreResult},
    store::{child_path, Store, ACTIVE, CURRENT_NONCE, INITIAL_NONCE, SOLUTION, WORKERS_PATH},
};
use tracing::{info, warn};

#[derive(Debug, Default, Clone, Copy)]
pub struct SweepStats {
    pub scanned: usize,
    pub reaped: usize,
}

pub fn sweep<S: Store>(store: &S) -> StoreResult<SweepStats> {
    let mut stats = SweepStats::default();
    let records = match store.children(WORKERS_PATH) {
        Ok(records) => records,
        Err(err) if err.is_not_found() => {
            warn!("{WORKERS_PATH} does not exist, nothing to sweep");
            return Ok(stats);
        }
        Err(err) => return Err(err),
    };

    for name in records {
        stats.scanned += 1;
        let record = format!("{WORKERS_PATH}/{name}");
        if store.exists(&child_path(&record, ACTIVE))?.is_some() {
            continue;
        }
        info!("removing defunct worker {record}");
        for child in [SOLUTION, INITIAL_NONCE, CURRENT_NONCE, ACTIVE] {
            delete_tolerant(store, &child_path(&record, child))?;
        }
        delete_tolerant(store, &record)?;
        stats.reaped += 1;
    }
    Ok(stats)
}

/// Another sweep (or the same one re-run) may have gotten there first.
fn delete_tolerant<S: Store>(store: &S, path: &str) -> StoreResult<()> {
    match store.delete(path, None) {
        Ok(()) | Err(StoreError::NotFound(_)) => Ok(()),
        Err(err) => Err(err),
    }
}
