//! Implementation of [`VersionGraph::put`], the version-insertion pipeline.

use crate::errors::{GraphError, Result};
use crate::types::VersionName;

use super::{node::VersionNode, Root, SlabIndex, VersionGraph};

/// Everything the validation phase of a put decides. The commit phase
/// applies a plan without further fallible checks, so a validation failure
/// leaves the graph untouched.
struct PutPlan {
    old_version: VersionName,
    new_version: VersionName,
    parent: Option<SlabIndex>,
    is_root: bool,
    is_orphan: bool,
    /// Orphans waiting for `new_version` as their parent, in name order.
    unorphans: Vec<SlabIndex>,
    /// The existing root names `new_version` as its absent parent.
    unorphans_existing_root: bool,
    /// Evict the current root to stay within a limit.
    erase_existing_root: bool,
}

impl VersionGraph {
    /// Inserts `new_version` as a child of `old_version`.
    ///
    /// Versions may arrive in any order: when `old_version` is not stored,
    /// `new_version` is kept as an orphan until that parent shows up, and
    /// when earlier puts are already waiting for `new_version` they are
    /// adopted as its children. Passing an uninitialised `old_version`
    /// declares `new_version` to be the true root.
    ///
    /// Returns the name of the version evicted to hold `max_versions`, if
    /// any. Putting a version that is already stored under the same parent
    /// is a no-op returning `None`.
    ///
    /// Fails with [`GraphError::InvalidParameter`] when the claimed parent
    /// contradicts stored state, would install a second true root, or would
    /// create a cycle; with [`GraphError::CannotExceedLimit`] when
    /// `max_branches` cannot be satisfied even by evicting the root.
    pub fn put(
        &mut self,
        old_version: &VersionName,
        new_version: &VersionName,
    ) -> Result<Option<VersionName>> {
        if !new_version.is_initialised() {
            return Err(GraphError::Uninitialized);
        }
        if self.new_version_pre_exists(old_version, new_version)? {
            return Ok(None);
        }

        // Check we have not been asked to store two true roots.
        let is_root = !old_version.is_initialised() || self.index_map.is_empty();
        if is_root && self.root.node.is_some() && !self.root.absent_parent.is_initialised() {
            return Err(GraphError::InvalidParameter);
        }

        let parent = if is_root {
            None
        } else {
            self.get_slab_index_by_name(old_version)
        };
        let is_orphan = parent.is_none() && !is_root;

        let unorphans: Vec<SlabIndex> = self
            .orphans
            .get(new_version)
            .map(|bucket| bucket.values().copied().collect())
            .unwrap_or_default();
        let unorphans_existing_root =
            self.root.absent_parent.is_initialised() && self.root.absent_parent == *new_version;

        self.check_no_cycle(parent, &unorphans, unorphans_existing_root)?;

        let mut erase_existing_root = false;
        if self.at_versions_limit() {
            if is_root || unorphans_existing_root {
                // The new version would become the root, only to be evicted
                // straight away to bring the count back down to the limit.
                return Ok(Some(*new_version));
            }
            erase_existing_root = true;
        }

        self.check_branch_count(
            parent,
            is_root,
            is_orphan,
            unorphans.len(),
            unorphans_existing_root,
            &mut erase_existing_root,
        )?;

        self.commit(PutPlan {
            old_version: *old_version,
            new_version: *new_version,
            parent,
            is_root,
            is_orphan,
            unorphans,
            unorphans_existing_root,
            erase_existing_root,
        })
    }

    /// Succeeds with `true` when `new_version` is already stored under the
    /// same claimed parent (the put is a replay), fails when the claim
    /// contradicts what is stored, and returns `false` when not stored.
    fn new_version_pre_exists(
        &self,
        old_version: &VersionName,
        new_version: &VersionName,
    ) -> Result<bool> {
        let Some(existing) = self.get_slab_index_by_name(new_version) else {
            return Ok(false);
        };
        match self.get_node_by_slab_index(existing).get_parent() {
            Some(parent_index) => {
                if self.get_node_by_slab_index(parent_index).get_name() == *old_version {
                    Ok(true)
                } else {
                    Err(GraphError::InvalidParameter)
                }
            }
            None if self.root.node == Some(existing) => {
                if self.root.absent_parent == *old_version {
                    Ok(true)
                } else {
                    Err(GraphError::InvalidParameter)
                }
            }
            None => match self.find_orphan(new_version) {
                Some(absent_parent) if absent_parent == *old_version => Ok(true),
                _ => Err(GraphError::InvalidParameter),
            },
        }
    }

    /// The commit phase adopts every candidate (the waiting orphans, plus
    /// the existing root when it names the incoming version as its parent)
    /// as a child of the incoming version, whose own parent chain runs
    /// upward from `parent`. A candidate already heading that chain would
    /// become its own ancestor.
    fn check_no_cycle(
        &self,
        parent: Option<SlabIndex>,
        unorphans: &[SlabIndex],
        unorphans_existing_root: bool,
    ) -> Result<()> {
        let Some(parent_index) = parent else {
            return Ok(());
        };
        if unorphans.is_empty() && !unorphans_existing_root {
            return Ok(());
        }
        let head = self.head_of_chain(parent_index);
        if unorphans.contains(&head)
            || (unorphans_existing_root && self.root.node == Some(head))
        {
            return Err(GraphError::InvalidParameter);
        }
        Ok(())
    }

    /// At the branch limit, a put that creates a tip without consuming one
    /// (an orphan, a fresh true root, or a fork off an occupied parent)
    /// must free a slot by evicting the root, which is only possible when
    /// the root itself is a tip.
    fn check_branch_count(
        &self,
        parent: Option<SlabIndex>,
        is_root: bool,
        is_orphan: bool,
        unorphan_count: usize,
        unorphans_existing_root: bool,
        erase_existing_root: &mut bool,
    ) -> Result<()> {
        if !self.at_branches_limit() || unorphan_count != 0 {
            return Ok(());
        }
        let parent_already_has_child = parent.map_or(false, |parent_index| {
            !self
                .get_node_by_slab_index(parent_index)
                .get_children()
                .is_empty()
        });
        // a true root that does not adopt the existing root demotes it to
        // an orphan, leaving its tip slot occupied
        let installs_fresh_root = is_root && !unorphans_existing_root;
        if is_orphan || installs_fresh_root || parent_already_has_child {
            let root_is_tip = self.root.node.map_or(false, |root_index| {
                self.get_node_by_slab_index(root_index)
                    .get_children()
                    .is_empty()
            });
            if !root_is_tip {
                return Err(GraphError::CannotExceedLimit);
            }
            // A version that adopts the existing root takes over its spot
            // rather than occupying a fresh tip slot, so nothing need be
            // evicted for it.
            if !unorphans_existing_root {
                *erase_existing_root = true;
            }
        }
        Ok(())
    }

    fn commit(&mut self, plan: PutPlan) -> Result<Option<VersionName>> {
        debug_assert!(!(plan.unorphans_existing_root && plan.erase_existing_root));

        let mut node = match plan.parent {
            Some(parent_index) => VersionNode::new_child(plan.new_version, parent_index),
            None => VersionNode::new_head(plan.new_version),
        };
        for &adopted in &plan.unorphans {
            node.insert_child(self.get_node_by_slab_index(adopted).get_name(), adopted);
        }
        if plan.unorphans_existing_root {
            if let Some(root_index) = self.root.node {
                node.insert_child(self.get_node_by_slab_index(root_index).get_name(), root_index);
            }
        }
        let inserted = self.nodes.insert(node);
        self.index_map.insert(plan.new_version, inserted);

        if !plan.unorphans.is_empty() {
            trace!(
                parent = %plan.new_version,
                count = plan.unorphans.len(),
                "adopting waiting orphans"
            );
            for &adopted in &plan.unorphans {
                self.get_node_mut_by_slab_index(adopted).set_parent(inserted);
            }
            self.orphans.remove(&plan.new_version);
        }

        if let Some(parent_index) = plan.parent {
            self.set_version_as_child_of_its_parent(inserted, parent_index);
        }

        if plan.is_orphan && !plan.unorphans_existing_root {
            self.insert_orphan(plan.old_version, plan.new_version, inserted);
        }

        let mut removed_version = None;
        if plan.is_root
            && self.root.absent_parent.is_initialised()
            && !plan.unorphans_existing_root
        {
            // The true root supersedes a provisional one, which keeps its
            // claimed parent and waits in `orphans` from now on. When the
            // provisional root's tip slot is needed to stay within
            // `max_branches` it is evicted instead.
            if let Some(old_root_index) = self.root.node {
                let old_root_name = self.get_node_by_slab_index(old_root_index).get_name();
                if plan.erase_existing_root {
                    debug!(evicted = %old_root_name, "evicting provisional root");
                    removed_version = Some(old_root_name);
                    let removed_tip = self.tips_of_trees.remove(&old_root_name);
                    debug_assert!(removed_tip.is_some());
                    self.detach_node(old_root_index);
                } else {
                    self.insert_orphan(self.root.absent_parent, old_root_name, old_root_index);
                }
            }
        }

        if plan.is_root {
            if plan.unorphans_existing_root {
                self.unorphan_root(inserted, true, &plan.old_version)?;
            } else {
                self.root = Root {
                    absent_parent: plan.old_version,
                    node: Some(inserted),
                };
            }
        } else if plan.unorphans_existing_root {
            self.unorphan_root(inserted, plan.is_orphan, &plan.old_version)?;
        } else if plan.erase_existing_root {
            removed_version = self.root_name();
            self.replace_root();
        }

        if self
            .get_node_by_slab_index(inserted)
            .get_children()
            .is_empty()
        {
            self.tips_of_trees.insert(plan.new_version, inserted);
        }

        Ok(removed_version)
    }

    /// Wires the freshly inserted version into its parent's child set,
    /// consuming the parent's tip slot if it held one.
    fn set_version_as_child_of_its_parent(
        &mut self,
        inserted: SlabIndex,
        parent_index: SlabIndex,
    ) {
        let parent_name = self.get_node_by_slab_index(parent_index).get_name();
        if self
            .get_node_by_slab_index(parent_index)
            .get_children()
            .is_empty()
        {
            let removed = self.tips_of_trees.remove(&parent_name);
            debug_assert!(removed.is_some());
        }
        let inserted_name = self.get_node_by_slab_index(inserted).get_name();
        self.get_node_mut_by_slab_index(parent_index).insert_child(inserted_name, inserted);
    }
}
