//! Implementation of basic methods for [`VersionGraph`]

mod node;
mod prune;
mod put;
mod root_change;
mod serialise;
mod wire;

pub(crate) type SlabIndex = usize;

use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;
use slab::Slab;

use crate::errors::{GraphError, Result};
use crate::types::VersionName;

use self::node::VersionNode;

/// Sorted handles into the arena, keyed by the referenced version's name.
type SortedVersionRefs = BTreeMap<VersionName, SlabIndex>;

/// Bounded history DAG of a mutable, content-addressed object.
///
/// # Fields:
/// - `nodes`: the arena (a [`Slab`]) holding one [`VersionNode`] per stored
///   version. Handles into it stay valid across insertions and are
///   invalidated only when that version is removed.
/// - `index_map`: name to handle lookup. Every name in the map corresponds
///   exactly to one live arena entry.
/// - `root`: the single accepted root together with the name it claims as
///   parent. While any version is stored there is exactly one root.
/// - `tips_of_trees`: the childless versions, name-sorted.
/// - `orphans`: versions whose claimed parent is not stored, bucketed by
///   that absent parent's name. Buckets are never empty.
///
/// # Usage:
/// Versions arrive in any order through [`VersionGraph::put`], including
/// children before their parents. Two limits bound the graph: reaching
/// `max_versions` evicts the current root, and `max_branches` caps the
/// number of concurrent branch tips. The graph round-trips through a
/// canonical byte form ([`VersionGraph::serialise`]) and can union-merge
/// another serialised graph into itself
/// ([`VersionGraph::apply_serialised`]).
#[derive(Debug, Clone)]
pub struct VersionGraph {
    max_versions: u32,
    max_branches: u32,

    nodes: Slab<VersionNode>,
    index_map: HashMap<VersionName, SlabIndex>,

    root: Root,
    tips_of_trees: SortedVersionRefs,
    orphans: BTreeMap<VersionName, SortedVersionRefs>,
}

/// The root slot: the stored root (if any) and what it claims as parent.
#[derive(Debug, Clone, Default)]
struct Root {
    /// Uninitialised for a true root; otherwise the name of the parent the
    /// root was derived from, which is not (or no longer) stored.
    absent_parent: VersionName,
    node: Option<SlabIndex>,
}

impl VersionGraph {
    /// Creates an empty graph. Both limits must be at least one.
    pub fn new(max_versions: u32, max_branches: u32) -> Result<Self> {
        if max_versions < 1 || max_branches < 1 {
            return Err(GraphError::InvalidParameter);
        }
        Ok(VersionGraph {
            max_versions,
            max_branches,
            nodes: Slab::new(),
            index_map: HashMap::new(),
            root: Root::default(),
            tips_of_trees: BTreeMap::new(),
            orphans: BTreeMap::new(),
        })
    }

    pub fn max_versions(&self) -> u32 {
        self.max_versions
    }

    pub fn max_branches(&self) -> u32 {
        self.max_branches
    }

    /// Number of stored versions.
    pub fn len(&self) -> usize {
        self.index_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_map.is_empty()
    }

    fn get_node_by_slab_index(&self, slab_index: SlabIndex) -> &VersionNode {
        &self.nodes[slab_index]
    }

    fn get_node_mut_by_slab_index(&mut self, slab_index: SlabIndex) -> &mut VersionNode {
        &mut self.nodes[slab_index]
    }

    fn get_slab_index_by_name(&self, name: &VersionName) -> Option<SlabIndex> {
        self.index_map.get(name).copied()
    }

    fn contains_name(&self, name: &VersionName) -> bool {
        self.index_map.contains_key(name)
    }

    fn root_name(&self) -> Option<VersionName> {
        self.root
            .node
            .map(|slab_index| self.get_node_by_slab_index(slab_index).get_name())
    }

    /// The root's claimed parent, when it records one.
    fn root_absent_parent(&self) -> Option<VersionName> {
        self.root
            .absent_parent
            .is_initialised()
            .then_some(self.root.absent_parent)
    }

    fn at_versions_limit(&self) -> bool {
        debug_assert!(self.index_map.len() <= self.max_versions as usize);
        self.index_map.len() == self.max_versions as usize
    }

    fn at_branches_limit(&self) -> bool {
        debug_assert!(self.tips_of_trees.len() <= self.max_branches as usize);
        self.tips_of_trees.len() == self.max_branches as usize
    }

    /// Walks parent links upward from `slab_index` to the head of its
    /// component.
    fn head_of_chain(&self, mut slab_index: SlabIndex) -> SlabIndex {
        while let Some(parent) = self.get_node_by_slab_index(slab_index).get_parent() {
            slab_index = parent;
        }
        slab_index
    }

    /// Finds the orphan bucket holding `name`, returning the bucket key
    /// (the orphan's absent parent).
    fn find_orphan(&self, name: &VersionName) -> Option<VersionName> {
        self.orphans
            .iter()
            .find(|(_, bucket)| bucket.contains_key(name))
            .map(|(&absent_parent, _)| absent_parent)
    }

    fn insert_orphan(
        &mut self,
        absent_parent: VersionName,
        name: VersionName,
        slab_index: SlabIndex,
    ) {
        let previous = self
            .orphans
            .entry(absent_parent)
            .or_default()
            .insert(name, slab_index);
        debug_assert!(previous.is_none());
    }

    /// Removes `name` from the bucket under `absent_parent`, dropping the
    /// bucket once empty.
    fn erase_orphan(&mut self, absent_parent: &VersionName, name: &VersionName) {
        if let Some(bucket) = self.orphans.get_mut(absent_parent) {
            bucket.remove(name);
            if bucket.is_empty() {
                self.orphans.remove(absent_parent);
            }
        }
    }

    /// Removes a version from the arena and the name index.
    ///
    /// Relationship bookkeeping (parent and child links, tips, orphans,
    /// the root slot) is the caller's responsibility.
    fn detach_node(&mut self, slab_index: SlabIndex) {
        let name = self.nodes.remove(slab_index).get_name();
        self.index_map.remove(&name);
    }
}

/// Structural equality: same limits and the same versions under the same
/// parents, with matching root, tip, and orphan bookkeeping. Arena handle
/// values are ignored.
impl PartialEq for VersionGraph {
    fn eq(&self, other: &Self) -> bool {
        if self.max_versions != other.max_versions
            || self.max_branches != other.max_branches
            || self.index_map.len() != other.index_map.len()
            || self.root_absent_parent() != other.root_absent_parent()
            || self.root_name() != other.root_name()
        {
            return false;
        }
        for (name, &slab_index) in &self.index_map {
            let Some(other_index) = other.get_slab_index_by_name(name) else {
                return false;
            };
            let parent = self
                .get_node_by_slab_index(slab_index)
                .get_parent()
                .map(|p| self.get_node_by_slab_index(p).get_name());
            let other_parent = other
                .get_node_by_slab_index(other_index)
                .get_parent()
                .map(|p| other.get_node_by_slab_index(p).get_name());
            if parent != other_parent {
                return false;
            }
        }
        self.tips_of_trees.keys().eq(other.tips_of_trees.keys())
            && self.orphans.len() == other.orphans.len()
            && self
                .orphans
                .iter()
                .zip_eq(other.orphans.iter())
                .all(|((key, bucket), (other_key, other_bucket))| {
                    key == other_key && bucket.keys().eq(other_bucket.keys())
                })
    }
}

impl Eq for VersionGraph {}

#[cfg(test)]
impl VersionGraph {
    /// Verifies every structural invariant of the graph.
    pub(crate) fn check_consistency(&self) -> bool {
        if self.nodes.len() != self.index_map.len() {
            return false;
        }
        if self.index_map.len() > self.max_versions as usize {
            return false;
        }
        if self.tips_of_trees.len() > self.max_branches as usize {
            return false;
        }

        match self.root.node {
            Some(root_index) => {
                let root_node = self.get_node_by_slab_index(root_index);
                if root_node.get_parent().is_some() {
                    return false;
                }
                if self.find_orphan(&root_node.get_name()).is_some() {
                    return false;
                }
            }
            None => {
                if !self.index_map.is_empty() || self.root.absent_parent.is_initialised() {
                    return false;
                }
            }
        }

        for (name, &slab_index) in &self.index_map {
            let node = match self.nodes.get(slab_index) {
                Some(node) => node,
                None => return false,
            };
            if node.get_name() != *name {
                return false;
            }

            match node.get_parent() {
                Some(parent_index) => {
                    let Some(parent) = self.nodes.get(parent_index) else {
                        return false;
                    };
                    if parent.get_children().get(name) != Some(&slab_index) {
                        return false;
                    }
                }
                None => {
                    let is_root = self.root.node == Some(slab_index);
                    let holding_buckets = self
                        .orphans
                        .values()
                        .filter(|bucket| bucket.contains_key(name))
                        .count();
                    if is_root && holding_buckets != 0 {
                        return false;
                    }
                    if !is_root && holding_buckets != 1 {
                        return false;
                    }
                }
            }

            for (child_name, &child_index) in node.get_children() {
                match self.nodes.get(child_index) {
                    Some(child)
                        if child.get_name() == *child_name
                            && child.get_parent() == Some(slab_index) => {}
                    _ => return false,
                }
            }

            if node.get_children().is_empty() {
                if self.tips_of_trees.get(name) != Some(&slab_index) {
                    return false;
                }
            } else if self.tips_of_trees.contains_key(name) {
                return false;
            }

            // acyclic: the walk to the head must terminate
            let mut steps = 0;
            let mut current = slab_index;
            loop {
                let Some(current_node) = self.nodes.get(current) else {
                    return false;
                };
                match current_node.get_parent() {
                    Some(parent) => current = parent,
                    None => break,
                }
                steps += 1;
                if steps > self.nodes.len() {
                    return false;
                }
            }
        }

        for bucket in self.orphans.values() {
            if bucket.is_empty() {
                return false;
            }
            for (orphan_name, &orphan_index) in bucket {
                match self.nodes.get(orphan_index) {
                    Some(node)
                        if node.get_name() == *orphan_name && node.get_parent().is_none() => {}
                    _ => return false,
                }
            }
        }

        let childless = self
            .index_map
            .values()
            .filter(|&&slab_index| {
                self.get_node_by_slab_index(slab_index)
                    .get_children()
                    .is_empty()
            })
            .count();
        self.tips_of_trees.len() == childless
    }
}
