use std::collections::HashMap;
use std::ops::Index;
use std::path::{Path, PathBuf};

/// Stable identifier of a node inside one [`crate::tree_model::TreeModel`].
///
/// Ids are dense indices handed out in insertion order, so a parent always
/// has a smaller id than any of its descendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Two-way lookup between node ids and absolute paths.
///
/// Built wholesale together with its tree and never patched afterwards.
#[derive(Debug, Default, Clone)]
pub struct PathIndex {
    by_id: Vec<PathBuf>,
    by_path: HashMap<PathBuf, NodeId>,
}

impl PathIndex {
    /// Registers `path` under the next free id. Returns `None` if the path is
    /// already indexed.
    pub(crate) fn insert(&mut self, path: PathBuf) -> Option<NodeId> {
        if self.by_path.contains_key(&path) {
            return None;
        }
        let id = NodeId(self.by_id.len());
        self.by_path.insert(path.clone(), id);
        self.by_id.push(path);
        Some(id)
    }

    pub fn id_of(&self, path: &Path) -> Option<NodeId> {
        self.by_path.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }
}

/// Panics when `id` was not handed out by this index.
impl Index<NodeId> for PathIndex {
    type Output = Path;

    fn index(&self, id: NodeId) -> &Path {
        &self.by_id[id.0]
    }
}
