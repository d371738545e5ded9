use crate::path_index::{NodeId, PathIndex};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// One path reported by the directory scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub path: PathBuf,
    pub is_dir: bool,
    pub size: Option<u64>,
}

impl ScanEntry {
    pub fn dir(path: impl Into<PathBuf>) -> Self {
        ScanEntry {
            path: path.into(),
            is_dir: true,
            size: None,
        }
    }

    pub fn file(path: impl Into<PathBuf>, size: u64) -> Self {
        ScanEntry {
            path: path.into(),
            is_dir: false,
            size: Some(size),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub id: NodeId,
    pub name: String,
    pub is_dir: bool,
    pub size: Option<u64>,
    /// Directories first, then files, each group sorted by name.
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        !self.is_dir
    }
}

/// In-memory snapshot of one scanned directory.
///
/// Nodes live in a flat arena indexed by [`NodeId`]; parents own their
/// children through `children`, and `parent` is a plain back-link used for
/// ancestor walks.
#[derive(Debug, Clone)]
pub struct TreeModel {
    root: NodeId,
    nodes: Vec<TreeNode>,
    index: PathIndex,
}

impl TreeModel {
    /// Builds the tree rooted at `root` from scan entries in any order.
    ///
    /// Entries outside `root` are dropped, missing intermediate directories
    /// are synthesized and duplicates keep their first occurrence.
    pub fn build(root: &Path, entries: impl IntoIterator<Item = ScanEntry>) -> Self {
        let mut index = PathIndex::default();
        let root_id = index
            .insert(root.to_path_buf())
            .unwrap_or(NodeId(0));
        let root_name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());

        let mut model = TreeModel {
            root: root_id,
            nodes: vec![TreeNode {
                id: root_id,
                name: root_name,
                is_dir: true,
                size: None,
                children: Vec::new(),
                parent: None,
            }],
            index,
        };

        let mut entries: Vec<ScanEntry> = entries.into_iter().collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        for entry in entries {
            if entry.path == root || !entry.path.starts_with(root) {
                continue;
            }
            model.attach(entry.path, entry.is_dir, entry.size);
        }
        model.sort_children();
        model
    }

    fn attach(&mut self, path: PathBuf, is_dir: bool, size: Option<u64>) -> Option<NodeId> {
        if let Some(existing) = self.index.id_of(&path) {
            return Some(existing);
        }
        let parent_path = path.parent()?;
        let parent = match self.index.id_of(parent_path) {
            Some(id) => id,
            None => self.attach(parent_path.to_path_buf(), true, None)?,
        };
        if !self.nodes[parent.0].is_dir {
            return None;
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let id = self.index.insert(path)?;
        self.nodes.push(TreeNode {
            id,
            name,
            is_dir,
            size: if is_dir { None } else { size },
            children: Vec::new(),
            parent: Some(parent),
        });
        self.nodes[parent.0].children.push(id);
        Some(id)
    }

    fn sort_children(&mut self) {
        for i in 0..self.nodes.len() {
            let mut children = std::mem::take(&mut self.nodes[i].children);
            children.sort_by(|a, b| {
                let (a, b) = (&self.nodes[a.0], &self.nodes[b.0]);
                match (a.is_dir, b.is_dir) {
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    _ => a.name.cmp(&b.name),
                }
            });
            self.nodes[i].children = children;
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_path(&self) -> &Path {
        &self.index[self.root]
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0)
    }

    pub fn path_of(&self, id: NodeId) -> &Path {
        &self.index[id]
    }

    #[cfg(test)]
    pub fn id_of(&self, path: &Path) -> Option<NodeId> {
        self.index.id_of(path)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// All ids in ascending order. Every parent precedes its descendants.
    pub fn ids(&self) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.nodes.iter().map(|n| n.id)
    }

    pub fn file_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Depth below the root (root is 0).
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.nodes[id.0].parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.nodes[parent.0].parent;
        }
        depth
    }

    /// Display order of the whole tree.
    #[cfg(test)]
    pub fn preorder(&self) -> Vec<NodeId> {
        self.subtree(self.root)
    }

    /// `id` followed by all of its descendants, in display order.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.nodes[current.0].children.iter().rev().copied());
        }
        out
    }

    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.nodes[id.0].parent,
        }
    }
}

/// Walks parent links up to (and including) the root.
pub struct Ancestors<'a> {
    tree: &'a TreeModel,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.nodes[current.0].parent;
        Some(current)
    }
}
