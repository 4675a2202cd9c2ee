//! In-process store backend with real session semantics: ephemeral nodes
//! owned by a session are removed when that session closes or is dropped.
//! Lets the whole system (worker, reaper, publisher, reporter) run and be
//! tested in one process with no external infrastructure.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use super::{Meta, Mode, Store};
use crate::errors::{StoreError, StoreResult};

#[derive(Default)]
struct Node {
    value: Vec<u8>,
    version: i32,
    created_ms: i64,
    modified_ms: i64,
    /// Owning session id for ephemeral nodes.
    owner: Option<u64>,
    /// Counter for sequential children created under this node.
    next_sequence: u32,
}

struct Tree {
    nodes: HashMap<String, Node>,
    next_session: u64,
}

impl Default for Tree {
    fn default() -> Self {
        let mut nodes = HashMap::new();
        // the root always exists
        nodes.insert("/".to_string(), Node::default());
        Self { nodes, next_session: 0 }
    }
}

/// The shared tree. Cheap to clone; sessions are opened per client.
#[derive(Default, Clone)]
pub struct MemoryStore {
    tree: Arc<Mutex<Tree>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> MemorySession {
        let mut tree = self.tree.lock().unwrap();
        let id = tree.next_session;
        tree.next_session += 1;
        MemorySession { tree: Arc::clone(&self.tree), id, open: AtomicBool::new(true) }
    }
}

pub struct MemorySession {
    tree: Arc<Mutex<Tree>>,
    id: u64,
    open: AtomicBool,
}

impl MemorySession {
    fn guard(&self) -> StoreResult<std::sync::MutexGuard<'_, Tree>> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(StoreError::Disconnected);
        }
        Ok(self.tree.lock().unwrap())
    }

    fn end(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            let mut tree = self.tree.lock().unwrap();
            tree.nodes.retain(|_, node| node.owner != Some(self.id));
        }
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        // crash or graceful exit, the ephemerals go either way
        self.end();
    }
}

impl Store for MemorySession {
    fn create(&self, path: &str, value: &[u8], mode: Mode) -> StoreResult<String> {
        let mut tree = self.guard()?;
        validate(path)?;

        let parent_path = parent_of(path).to_string();
        let parent = tree
            .nodes
            .get_mut(&parent_path)
            .ok_or_else(|| StoreError::NotFound(parent_path.clone()))?;
        if parent.owner.is_some() {
            return Err(StoreError::Other(format!(
                "ephemeral node {parent_path} cannot have children"
            )));
        }

        let actual = if mode.is_sequential() {
            let sequence = parent.next_sequence;
            parent.next_sequence += 1;
            format!("{path}{sequence:010}")
        } else {
            path.to_string()
        };

        if tree.nodes.contains_key(&actual) {
            return Err(StoreError::AlreadyExists(actual));
        }

        let now = crate::timestamp();
        tree.nodes.insert(
            actual.clone(),
            Node {
                value: value.to_vec(),
                version: 0,
                created_ms: now,
                modified_ms: now,
                owner: mode.is_ephemeral().then_some(self.id),
                next_sequence: 0,
            },
        );
        Ok(actual)
    }

    fn exists(&self, path: &str) -> StoreResult<Option<Meta>> {
        let tree = self.guard()?;
        Ok(tree.nodes.get(path).map(meta))
    }

    fn read(&self, path: &str) -> StoreResult<(Vec<u8>, Meta)> {
        let tree = self.guard()?;
        let node = tree.nodes.get(path).ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        Ok((node.value.clone(), meta(node)))
    }

    fn write(&self, path: &str, value: &[u8], expected: Option<i32>) -> StoreResult<i32> {
        let mut tree = self.guard()?;
        let node =
            tree.nodes.get_mut(path).ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        if let Some(version) = expected {
            if version != node.version {
                return Err(StoreError::VersionConflict(path.to_string()));
            }
        }
        node.value = value.to_vec();
        node.version += 1;
        node.modified_ms = crate::timestamp();
        Ok(node.version)
    }

    fn delete(&self, path: &str, expected: Option<i32>) -> StoreResult<()> {
        let mut tree = self.guard()?;
        let node = tree.nodes.get(path).ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        if let Some(version) = expected {
            if version != node.version {
                return Err(StoreError::VersionConflict(path.to_string()));
            }
        }
        let prefix = format!("{path}/");
        if tree.nodes.keys().any(|k| k.starts_with(&prefix)) {
            return Err(StoreError::Other(format!("node {path} has children")));
        }
        tree.nodes.remove(path);
        Ok(())
    }

    fn children(&self, path: &str) -> StoreResult<Vec<String>> {
        let tree = self.guard()?;
        if !tree.nodes.contains_key(path) {
            return Err(StoreError::NotFound(path.to_string()));
        }
        let prefix = if path == "/" { "/".to_string() } else { format!("{path}/") };
        let mut names: Vec<String> = tree
            .nodes
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
            .map(str::to_string)
            .collect();
        names.sort();
        Ok(names)
    }

    fn close(&self) -> StoreResult<()> {
        self.end();
        Ok(())
    }
}

fn meta(node: &Node) -> Meta {
    Meta { version: node.version, created_ms: node.created_ms, modified_ms: node.modified_ms }
}

fn validate(path: &str) -> StoreResult<()> {
    if !path.starts_with('/') || path.len() < 2 {
        return Err(StoreError::Other(format!("invalid path {path:?}")));
    }
    Ok(())
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}
