//! Tip queries and destructive pruning for [`VersionGraph`]

use crate::errors::{GraphError, Result};
use crate::types::VersionName;

use super::{Root, SlabIndex, VersionGraph};

impl VersionGraph {
    /// Returns the names of all branch tips, name-sorted.
    pub fn get(&self) -> Vec<VersionName> {
        self.tips_of_trees.keys().copied().collect()
    }

    /// Returns the ancestor path from `branch_tip` (inclusive) up to the
    /// head of its component, the root or an orphan.
    ///
    /// Fails with [`GraphError::NoSuchElement`] when the name is not stored
    /// at all and [`GraphError::InvalidParameter`] when it is stored but is
    /// not a branch tip.
    pub fn get_branch(&self, branch_tip: &VersionName) -> Result<Vec<VersionName>> {
        let tip_index = self.checked_branch_tip(branch_tip)?;
        let mut branch = Vec::new();
        let mut current = Some(tip_index);
        while let Some(slab_index) = current {
            let node = self.get_node_by_slab_index(slab_index);
            branch.push(node.get_name());
            current = node.get_parent();
        }
        Ok(branch)
    }

    /// Removes the branch ending at `branch_tip`, walking upward until a
    /// version that still has another child (a fork) and stopping there.
    /// When the walk reaches the head of the component the head is removed
    /// too: an orphan head leaves its bucket, a root head hands over to the
    /// least orphan, or the graph becomes empty.
    ///
    /// Error taxonomy matches [`VersionGraph::get_branch`].
    pub fn delete_branch_until_fork(&mut self, branch_tip: &VersionName) -> Result<()> {
        let tip_index = self.checked_branch_tip(branch_tip)?;
        debug!(tip = %branch_tip, "deleting branch up to the nearest fork");
        self.tips_of_trees.remove(branch_tip);

        let mut slab_index = tip_index;
        loop {
            let name = self.get_node_by_slab_index(slab_index).get_name();
            let Some(parent_index) = self.get_node_by_slab_index(slab_index).get_parent() else {
                self.erase_front_of_branch(slab_index);
                return Ok(());
            };
            self.get_node_mut_by_slab_index(parent_index).remove_child(&name);
            self.detach_node(slab_index);
            if !self
                .get_node_by_slab_index(parent_index)
                .get_children()
                .is_empty()
            {
                // found a fork
                return Ok(());
            }
            slab_index = parent_index;
        }
    }

    fn checked_branch_tip(&self, name: &VersionName) -> Result<SlabIndex> {
        match self.tips_of_trees.get(name) {
            Some(&slab_index) => Ok(slab_index),
            None if self.contains_name(name) => Err(GraphError::InvalidParameter),
            None => Err(GraphError::NoSuchElement),
        }
    }

    /// Removes the head of a fully pruned branch.
    fn erase_front_of_branch(&mut self, front: SlabIndex) {
        if self.root.node == Some(front) {
            if self.orphans.is_empty() {
                self.detach_node(front);
                self.root = Root::default();
                debug_assert!(self.index_map.is_empty() && self.tips_of_trees.is_empty());
            } else {
                self.replace_root_from_orphans();
            }
        } else {
            let front_name = self.get_node_by_slab_index(front).get_name();
            if let Some(absent_parent) = self.find_orphan(&front_name) {
                self.erase_orphan(&absent_parent, &front_name);
            }
            self.detach_node(front);
        }
    }

    /// Drops every stored version, returning to the freshly constructed
    /// state while keeping the limits.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.index_map.clear();
        self.tips_of_trees.clear();
        self.orphans.clear();
        self.root = Root::default();
    }
}
