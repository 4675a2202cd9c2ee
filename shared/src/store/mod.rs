//! Thin façade over a hierarchical coordination store with
//! persistent-vs-ephemeral node semantics, store-assigned sequential
//! suffixes, optimistic versioned writes, and per-node timing metadata.
//!
//! Ephemeral nodes vanish when the owning session ends; that property is
//! the sole liveness oracle in this system.

pub mod memory;
pub mod zk;

use crate::errors::StoreResult;

/// Node holding the current problem descriptor.
pub const CONFIG_PATH: &str = "/config";
/// Parent of all worker records.
pub const WORKERS_PATH: &str = "/workers";
/// Worker records are created as `/workers/bc-<sequence>`.
pub const WORKER_PREFIX: &str = "bc-";

// Children of a worker record.
pub const INITIAL_NONCE: &str = "initial-nonce";
pub const CURRENT_NONCE: &str = "current-nonce";
pub const SOLUTION: &str = "solution";
pub const ACTIVE: &str = "active";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Persistent,
    /// Persistent, with a store-assigned monotonically increasing suffix
    /// appended to the requested path. Collision-free under concurrent
    /// creation.
    PersistentSequential,
    /// Removed by the store when the creating session ends.
    Ephemeral,
    EphemeralSequential,
}

impl Mode {
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Mode::Ephemeral | Mode::EphemeralSequential)
    }

    pub fn is_sequential(&self) -> bool {
        matches!(self, Mode::PersistentSequential | Mode::EphemeralSequential)
    }
}

/// Node metadata. Creation and modification times are milliseconds since
/// the epoch, as stamped by the store.
#[derive(Debug, Clone, Copy)]
pub struct Meta {
    pub version: i32,
    pub created_ms: i64,
    pub modified_ms: i64,
}

/// One session against the coordination store. All calls block, bounded by
/// the session/request timeout, and every failure carries a tagged
/// [`crate::errors::StoreError`].
pub trait Store {
    /// Returns the actual path of the created node (which differs from the
    /// requested one for sequential modes).
    fn create(&self, path: &str, value: &[u8], mode: Mode) -> StoreResult<String>;

    fn exists(&self, path: &str) -> StoreResult<Option<Meta>>;

    fn read(&self, path: &str) -> StoreResult<(Vec<u8>, Meta)>;

    /// `expected` of `None` writes unconditionally; `Some(v)` fails with a
    /// version conflict unless the node is at version `v`.
    fn write(&self, path: &str, value: &[u8], expected: Option<i32>) -> StoreResult<i32>;

    fn delete(&self, path: &str, expected: Option<i32>) -> StoreResult<()>;

    fn children(&self, path: &str) -> StoreResult<Vec<String>>;

    /// Release the session. Ephemeral nodes owned by it are removed by the
    /// store, never by a direct delete.
    fn close(&self) -> StoreResult<()>;
}

/// Path of a worker record child.
pub fn child_path(record: &str, child: &str) -> String {
    format!("{record}/{child}")
}
