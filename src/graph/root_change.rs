//! Root eviction and root unorphaning internals for [`VersionGraph`]

use crate::errors::{GraphError, Result};
use crate::types::VersionName;

use super::{Root, SlabIndex, VersionGraph};

impl VersionGraph {
    /// Evicts the current root to free a version or branch slot.
    pub(super) fn replace_root(&mut self) {
        let Some(root_index) = self.root.node else {
            return;
        };
        let root_name = self.get_node_by_slab_index(root_index).get_name();
        debug!(evicted = %root_name, "evicting root");
        self.tips_of_trees.remove(&root_name);

        if self
            .get_node_by_slab_index(root_index)
            .get_children()
            .is_empty()
        {
            self.replace_root_from_orphans();
        } else {
            self.replace_root_from_children();
        }
    }

    /// Erases the childless root and promotes the least orphan of the
    /// least bucket; with no orphans left the graph becomes empty.
    pub(super) fn replace_root_from_orphans(&mut self) {
        if let Some(root_index) = self.root.node {
            self.detach_node(root_index);
        }

        let least_orphan = self
            .orphans
            .iter()
            .next()
            .and_then(|(&absent_parent, bucket)| {
                bucket
                    .iter()
                    .next()
                    .map(|(&name, &slab_index)| (absent_parent, name, slab_index))
            });
        match least_orphan {
            Some((absent_parent, name, slab_index)) => {
                self.erase_orphan(&absent_parent, &name);
                self.root = Root {
                    absent_parent,
                    node: Some(slab_index),
                };
            }
            None => self.root = Root::default(),
        }
    }

    /// Promotes the root's first child and reparents the remaining children
    /// as orphans missing the just-evicted name.
    fn replace_root_from_children(&mut self) {
        let Some(root_index) = self.root.node else {
            return;
        };
        let old_root_name = self.get_node_by_slab_index(root_index).get_name();
        let children: Vec<(VersionName, SlabIndex)> = self
            .get_node_by_slab_index(root_index)
            .get_children()
            .iter()
            .map(|(&name, &slab_index)| (name, slab_index))
            .collect();

        let Some((&(_, new_root_index), siblings)) = children.split_first() else {
            return;
        };
        self.get_node_mut_by_slab_index(new_root_index).set_as_head();
        for &(name, slab_index) in siblings {
            self.get_node_mut_by_slab_index(slab_index).set_as_head();
            self.insert_orphan(old_root_name, name, slab_index);
        }

        self.detach_node(root_index);
        self.root = Root {
            absent_parent: old_root_name,
            node: Some(new_root_index),
        };
    }

    /// Rewires the root pointer after the current root has been adopted as
    /// a child of `inserted`.
    ///
    /// When the inserted version itself heads its component (a true root or
    /// an orphan) it simply becomes the root. Otherwise the head of the
    /// component it joined must be an orphan, and that head is promoted.
    pub(super) fn unorphan_root(
        &mut self,
        inserted: SlabIndex,
        is_root_or_orphan: bool,
        old_version: &VersionName,
    ) -> Result<()> {
        if let Some(old_root_index) = self.root.node {
            self.get_node_mut_by_slab_index(old_root_index).set_parent(inserted);
        }

        if is_root_or_orphan {
            self.root = Root {
                absent_parent: *old_version,
                node: Some(inserted),
            };
            return Ok(());
        }

        let head = self.head_of_chain(inserted);
        let head_name = self.get_node_by_slab_index(head).get_name();
        let Some(absent_parent) = self.find_orphan(&head_name) else {
            return Err(GraphError::Unknown);
        };
        self.erase_orphan(&absent_parent, &head_name);
        self.root = Root {
            absent_parent,
            node: Some(head),
        };
        Ok(())
    }
}
