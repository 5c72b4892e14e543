//! Inode table: `fuser` addresses everything by `u64` inode number, while
//! [`crate::path`] classifies by path. This bridges the two: a path-keyed
//! table that interns a stable inode the first time a node is named and
//! returns it on every later lookup.

use std::collections::HashMap;

use crate::path::ControlDirection;

pub const ROOT_INO: u64 = 1;

/// What one allocated inode names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    SearchDir { query: String },
    ResultFile { query: String, name: String },
    ControlFile { query: String, direction: ControlDirection },
}

impl NodeKind {
    /// Canonical path key used to dedupe allocations; stable across calls
    /// for the same logical node.
    fn path_key(&self) -> String {
        match self {
            NodeKind::Root => "/".to_string(),
            NodeKind::SearchDir { query } => format!("/{query}"),
            NodeKind::ResultFile { query, name } => format!("/{query}/{name}"),
            NodeKind::ControlFile { query, direction } => {
                let literal = match direction {
                    ControlDirection::Next => " next",
                    ControlDirection::Prev => " prev",
                };
                format!("/{query}/{literal}")
            }
        }
    }
}

struct Inner {
    nodes: HashMap<u64, NodeKind>,
    by_path: HashMap<String, u64>,
    next_ino: u64,
}

/// Maps stable inode numbers onto [`NodeKind`]s. Entries are never evicted:
/// `forget` is a hint this filesystem has no reason to act on, since no
/// per-inode state outlives the node's owning `ResultSet`/`StreamingStore`.
pub struct InodeTable {
    inner: std::sync::Mutex<Inner>,
}

impl InodeTable {
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        let mut by_path = HashMap::new();
        nodes.insert(ROOT_INO, NodeKind::Root);
        by_path.insert("/".to_string(), ROOT_INO);
        Self { inner: std::sync::Mutex::new(Inner { nodes, by_path, next_ino: ROOT_INO + 1 }) }
    }

    /// Returns the existing inode for `kind`, or allocates a new one.
    pub fn intern(&self, kind: NodeKind) -> u64 {
        let key = kind.path_key();
        let mut inner = self.inner.lock().unwrap();
        if let Some(&ino) = inner.by_path.get(&key) {
            return ino;
        }
        let ino = inner.next_ino;
        inner.next_ino += 1;
        inner.nodes.insert(ino, kind);
        inner.by_path.insert(key, ino);
        ino
    }

    pub fn get(&self, ino: u64) -> Option<NodeKind> {
        self.inner.lock().unwrap().nodes.get(&ino).cloned()
    }
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_the_same_node_twice_returns_the_same_inode() {
        let table = InodeTable::new();
        let a = table.intern(NodeKind::SearchDir { query: "cats".to_string() });
        let b = table.intern(NodeKind::SearchDir { query: "cats".to_string() });
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_nodes_get_distinct_inodes() {
        let table = InodeTable::new();
        let a = table.intern(NodeKind::SearchDir { query: "cats".to_string() });
        let b = table.intern(NodeKind::SearchDir { query: "dogs".to_string() });
        assert_ne!(a, b);
    }

    #[test]
    fn root_is_preseeded() {
        let table = InodeTable::new();
        assert_eq!(table.get(ROOT_INO), Some(NodeKind::Root));
    }
}
