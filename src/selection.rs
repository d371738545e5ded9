use crate::path_index::NodeId;
use crate::tree_model::TreeModel;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Checkbox state of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckState {
    #[default]
    Unchecked,
    Checked,
    /// Directories only: some but not all children are checked.
    Mixed,
}

/// What a click on a node does, decided from its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    Select,
    Deselect,
}

impl ToggleAction {
    /// `Mixed` resolves to `Select`, so a click on a partially selected
    /// directory always selects everything below it.
    pub fn for_state(state: CheckState) -> Self {
        match state {
            CheckState::Unchecked | CheckState::Mixed => ToggleAction::Select,
            CheckState::Checked => ToggleAction::Deselect,
        }
    }

    fn leaf_state(self) -> CheckState {
        match self {
            ToggleAction::Select => CheckState::Checked,
            ToggleAction::Deselect => CheckState::Unchecked,
        }
    }
}

/// Owns the per-node tri-state and the set of selected file paths for one
/// scanned tree.
///
/// Every mutation goes through [`SelectionEngine::apply`] or the
/// whole-tree passes, which update both views in the same call, so
/// `selected_paths` always equals the set of checked leaves and every
/// directory state is derived from its children:
///
/// * `Checked` iff it has children and all of them are `Checked`
/// * `Unchecked` iff it has no children or all of them are `Unchecked`
/// * `Mixed` otherwise
#[derive(Debug, Clone)]
pub struct SelectionEngine {
    tree: TreeModel,
    states: Vec<CheckState>,
    selected: BTreeSet<PathBuf>,
}

impl SelectionEngine {
    /// Everything starts unchecked.
    pub fn new(tree: TreeModel) -> Self {
        let states = vec![CheckState::Unchecked; tree.len()];
        SelectionEngine {
            tree,
            states,
            selected: BTreeSet::new(),
        }
    }

    pub fn tree(&self) -> &TreeModel {
        &self.tree
    }

    pub fn state(&self, id: NodeId) -> CheckState {
        self.states
            .get(id.index())
            .copied()
            .unwrap_or(CheckState::Unchecked)
    }

    pub fn selected_paths(&self) -> &BTreeSet<PathBuf> {
        &self.selected
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    #[cfg(test)]
    pub fn is_selected(&self, path: &Path) -> bool {
        self.selected.contains(path)
    }

    /// Flips `id` according to [`ToggleAction::for_state`] and returns the
    /// action taken. Unknown ids are ignored.
    pub fn toggle_node(&mut self, id: NodeId) -> Option<ToggleAction> {
        self.tree.get(id)?;
        let action = ToggleAction::for_state(self.state(id));
        self.apply(id, action);
        Some(action)
    }

    /// Forces `action` onto `id` and its whole subtree, then recomputes every
    /// ancestor.
    pub fn apply(&mut self, id: NodeId, action: ToggleAction) {
        if self.tree.get(id).is_none() {
            return;
        }
        if self.tree.node(id).is_leaf() {
            self.set_leaf(id, action);
        } else {
            self.propagate_down(id, action);
        }
        self.recompute_ancestors(id);
    }

    pub fn select_all(&mut self) {
        self.set_everything(ToggleAction::Select);
    }

    pub fn deselect_all(&mut self) {
        self.set_everything(ToggleAction::Deselect);
    }

    /// Selects every leaf whose path relative to the scan root satisfies
    /// `matches`. Returns how many leaves matched.
    pub fn select_matching<F>(&mut self, mut matches: F) -> usize
    where
        F: FnMut(&Path) -> bool,
    {
        let root = self.tree.root_path().to_path_buf();
        let hits: Vec<NodeId> = self
            .tree
            .ids()
            .filter(|id| {
                self.tree.node(*id).is_leaf()
                    && self
                        .tree
                        .path_of(*id)
                        .strip_prefix(&root)
                        .map(|rel| matches(rel))
                        .unwrap_or(false)
            })
            .collect();
        for id in &hits {
            self.apply(*id, ToggleAction::Select);
        }
        hits.len()
    }

    fn set_leaf(&mut self, id: NodeId, action: ToggleAction) {
        let path = self.tree.path_of(id);
        match action {
            ToggleAction::Select => {
                self.selected.insert(path.to_path_buf());
            }
            ToggleAction::Deselect => {
                self.selected.remove(path);
            }
        }
        self.states[id.index()] = action.leaf_state();
    }

    /// Top-down pass: every leaf under `id` takes the action, then the
    /// directories of the subtree are re-derived bottom-up. Prior mixed
    /// sub-states are overwritten.
    fn propagate_down(&mut self, id: NodeId, action: ToggleAction) {
        let subtree = self.tree.subtree(id);
        for &node in &subtree {
            if self.tree.node(node).is_leaf() {
                self.set_leaf(node, action);
            }
        }
        for &node in subtree.iter().rev() {
            if self.tree.node(node).is_dir {
                self.states[node.index()] = self.derive_dir_state(node);
            }
        }
    }

    /// Bottom-up pass from the parent of `id` to the root.
    fn recompute_ancestors(&mut self, id: NodeId) {
        let chain: Vec<NodeId> = self.tree.ancestors(id).collect();
        for ancestor in chain {
            self.states[ancestor.index()] = self.derive_dir_state(ancestor);
        }
    }

    fn set_everything(&mut self, action: ToggleAction) {
        match action {
            ToggleAction::Select => {
                self.selected = self
                    .tree
                    .ids()
                    .filter(|id| self.tree.node(*id).is_leaf())
                    .map(|id| self.tree.path_of(id).to_path_buf())
                    .collect();
            }
            ToggleAction::Deselect => self.selected.clear(),
        }
        // Children carry larger ids than their parents, so a reverse sweep
        // sees every child before the directory that contains it.
        let ids: Vec<NodeId> = self.tree.ids().rev().collect();
        for id in ids {
            self.states[id.index()] = if self.tree.node(id).is_leaf() {
                action.leaf_state()
            } else {
                self.derive_dir_state(id)
            };
        }
    }

    fn derive_dir_state(&self, id: NodeId) -> CheckState {
        let children = &self.tree.node(id).children;
        if children.is_empty() {
            return CheckState::Unchecked;
        }
        let mut checked = 0;
        let mut unchecked = 0;
        for child in children {
            match self.states[child.index()] {
                CheckState::Checked => checked += 1,
                CheckState::Unchecked => unchecked += 1,
                CheckState::Mixed => return CheckState::Mixed,
            }
        }
        if checked == children.len() {
            CheckState::Checked
        } else if unchecked == children.len() {
            CheckState::Unchecked
        } else {
            CheckState::Mixed
        }
    }
}
