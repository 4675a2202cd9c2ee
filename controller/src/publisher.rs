//! The single trusted publisher of the problem descriptor. Creating or
//! overwriting `/config` starts (or rotates) a mining round; deleting it is
//! the global shutdown signal.

use shared::{
    errors::{StoreError, StoreResult},
    problem::Problem,
    store::{Mode, Store, CONFIG_PATH, WORKERS_PATH},
};
use tracing::info;

/// Write the descriptor, creating it if absent. No version check: last
/// writer wins, there is only one publisher by design. Also makes sure the
/// workers root exists so workers have somewhere to register.
pub fn publish<S: Store>(store: &S, problem: &Problem) -> StoreResult<()> {
    ensure_workers_root(store)?;
    let value = problem.encode();
    match store.exists(CONFIG_PATH)? {
        Some(_) => {
            store.write(CONFIG_PATH, value.as_bytes(), None)?;
            info!("updated {CONFIG_PATH}");
        }
        None => {
            store.create(CONFIG_PATH, value.as_bytes(), Mode::Persistent)?;
            info!("created {CONFIG_PATH}");
        }
    }
    Ok(())
}

/// Delete the descriptor. Returns false when it was already gone, which is
/// a benign repeat of the shutdown, not an error.
pub fn retract<S: Store>(store: &S) -> StoreResult<bool> {
    match store.delete(CONFIG_PATH, None) {
        Ok(()) => Ok(true),
        Err(err) if err.is_not_found() => Ok(false),
        Err(err) => Err(err),
    }
}

fn ensure_workers_root<S: Store>(store: &S) -> StoreResult<()> {
    match store.create(WORKERS_PATH, &[], Mode::Persistent) {
        Ok(_) => {
            info!("created {WORKERS_PATH}");
            Ok(())
        }
        // a concurrent bootstrap got there first, same outcome
        Err(StoreError::AlreadyExists(_)) => Ok(()),
        Err(err) => Err(err),
    }
}
