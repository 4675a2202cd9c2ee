//! ZooKeeper backend. One `ZkStore` is one session; ephemeral nodes created
//! through it are released by the server when the session ends.

use std::time::Duration;

use tracing::{debug, info};
use zookeeper::{Acl, CreateMode, Stat, WatchedEvent, Watcher, ZkError, ZooKeeper};

use super::{Meta, Mode, Store};
use crate::errors::{StoreError, StoreResult};

/// The watcher only matters for the one-shot session-established signal at
/// connect time (which `ZooKeeper::connect` already blocks on); descriptor
/// changes are discovered by polling, never by subscription.
struct SessionWatcher;

impl Watcher for SessionWatcher {
    fn handle(&self, event: WatchedEvent) {
        debug!("session event: {event:?}");
    }
}

pub struct ZkStore {
    zk: ZooKeeper,
}

impl ZkStore {
    pub fn connect(hosts: &str, timeout: Duration) -> StoreResult<Self> {
        let zk =
            ZooKeeper::connect(hosts, timeout, SessionWatcher).map_err(|e| map_err(hosts, e))?;
        info!("store session established ({hosts})");
        Ok(Self { zk })
    }
}

impl Store for ZkStore {
    fn create(&self, path: &str, value: &[u8], mode: Mode) -> StoreResult<String> {
        self.zk
            .create(path, value.to_vec(), Acl::open_unsafe().clone(), create_mode(mode))
            .map_err(|e| map_err(path, e))
    }

    fn exists(&self, path: &str) -> StoreResult<Option<Meta>> {
        let stat = self.zk.exists(path, false).map_err(|e| map_err(path, e))?;
        Ok(stat.as_ref().map(meta))
    }

    fn read(&self, path: &str) -> StoreResult<(Vec<u8>, Meta)> {
        let (value, stat) = self.zk.get_data(path, false).map_err(|e| map_err(path, e))?;
        Ok((value, meta(&stat)))
    }

    fn write(&self, path: &str, value: &[u8], expected: Option<i32>) -> StoreResult<i32> {
        let stat =
            self.zk.set_data(path, value.to_vec(), expected).map_err(|e| map_err(path, e))?;
        Ok(stat.version)
    }

    fn delete(&self, path: &str, expected: Option<i32>) -> StoreResult<()> {
        self.zk.delete(path, expected).map_err(|e| map_err(path, e))
    }

    fn children(&self, path: &str) -> StoreResult<Vec<String>> {
        self.zk.get_children(path, false).map_err(|e| map_err(path, e))
    }

    fn close(&self) -> StoreResult<()> {
        self.zk.close().map_err(|e| map_err("close", e))
    }
}

fn meta(stat: &Stat) -> Meta {
    Meta { version: stat.version, created_ms: stat.ctime, modified_ms: stat.mtime }
}

fn create_mode(mode: Mode) -> CreateMode {
    match mode {
        Mode::Persistent => CreateMode::Persistent,
        Mode::PersistentSequential => CreateMode::PersistentSequential,
        Mode::Ephemeral => CreateMode::Ephemeral,
        Mode::EphemeralSequential => CreateMode::EphemeralSequential,
    }
}

fn map_err(path: &str, err: ZkError) -> StoreError {
    match err {
        ZkError::NoNode => StoreError::NotFound(path.to_string()),
        ZkError::NodeExists => StoreError::AlreadyExists(path.to_string()),
        ZkError::BadVersion => StoreError::VersionConflict(path.to_string()),
        ZkError::ConnectionLoss | ZkError::SessionExpired => StoreError::Disconnected,
        ZkError::OperationTimeout => StoreError::Timeout,
        other => StoreError::Other(format!("{other:?} ({path})")),
    }
}
