//! Canonical serialisation, deserialisation, and union-merge for
//! [`VersionGraph`]

use crate::codec::{Decode, Encode};
use crate::errors::{GraphError, Result};
use crate::types::VersionName;

use super::{
    node::VersionNode,
    wire::{WireBranch, WireGraph, WireVersion},
    Root, SlabIndex, VersionGraph,
};

impl VersionGraph {
    /// Encodes the graph into its canonical byte form: the root's branch
    /// first, then every orphan branch in bucket order. Structurally equal
    /// graphs serialise to equal bytes.
    pub fn serialise(&self) -> Vec<u8> {
        let mut wire = WireGraph {
            max_versions: self.max_versions,
            max_branches: self.max_branches,
            branches: Vec::new(),
        };
        if let Some(root_index) = self.root.node {
            self.branch_to_wire(root_index, &self.root.absent_parent, &mut wire);
        }
        for (absent_parent, bucket) in &self.orphans {
            for &orphan_index in bucket.values() {
                self.branch_to_wire(orphan_index, absent_parent, &mut wire);
            }
        }
        wire.encode_to_vec()
    }

    fn branch_to_wire(&self, head: SlabIndex, absent_parent: &VersionName, wire: &mut WireGraph) {
        let branch = WireBranch {
            absent_parent: absent_parent.is_initialised().then_some(*absent_parent),
            names: Vec::new(),
        };
        let branch_position = wire.branches.len();
        wire.branches.push(branch);
        self.walk_branch(head, branch_position, wire);
    }

    /// Emits the linear run from `slab_index` into the branch at
    /// `branch_position`, opening a fresh continuation branch per child at
    /// a fork.
    fn walk_branch(&self, mut slab_index: SlabIndex, branch_position: usize, wire: &mut WireGraph) {
        loop {
            let node = self.get_node_by_slab_index(slab_index);
            let name = node.get_name();
            let children: Vec<SlabIndex> = node.get_children().values().copied().collect();
            wire.branches[branch_position].names.push(WireVersion {
                index: name.index,
                id: name.id,
                forking_child_count: (children.len() >= 2).then(|| children.len() as u32),
            });
            match children.as_slice() {
                [] => return,
                [only_child] => slab_index = *only_child,
                forked => {
                    for &child in forked {
                        let continuation = wire.branches.len();
                        wire.branches.push(WireBranch::default());
                        self.walk_branch(child, continuation, wire);
                    }
                    return;
                }
            }
        }
    }

    /// Decodes a graph from bytes produced by [`VersionGraph::serialise`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let wire = WireGraph::decode_all(bytes)?;
        Self::from_wire(wire)
    }

    fn from_wire(wire: WireGraph) -> Result<Self> {
        let mut graph = VersionGraph::new(wire.max_versions, wire.max_branches)?;
        let mut branch_index = 0;
        while branch_index < wire.branches.len() {
            graph.branch_from_wire(None, &wire.branches, &mut branch_index)?;
        }
        if graph.index_map.len() > graph.max_versions as usize
            || graph.tips_of_trees.len() > graph.max_branches as usize
        {
            return Err(GraphError::ParsingError);
        }
        Ok(graph)
    }

    /// Reads one branch, then recursively the continuation branches its
    /// trailing fork announces.
    fn branch_from_wire(
        &mut self,
        parent: Option<SlabIndex>,
        branches: &[WireBranch],
        branch_index: &mut usize,
    ) -> Result<()> {
        let Some(branch) = branches.get(*branch_index) else {
            // a fork announced more continuation branches than the stream holds
            return Err(GraphError::ParsingError);
        };
        let Some((last, inner)) = branch.names.split_last() else {
            // branches are never empty
            return Err(GraphError::ParsingError);
        };
        // only the last version of a branch may fork
        if inner.iter().any(|blob| blob.forking_child_count.is_some()) {
            return Err(GraphError::ParsingError);
        }

        let head_name = branch.names[0].name();
        let head = self.checked_insert(head_name, parent)?;
        match parent {
            Some(parent_index) => {
                // a continuation of a fork never records an absent parent
                if branch.absent_parent.is_some() {
                    return Err(GraphError::ParsingError);
                }
                self.get_node_mut_by_slab_index(parent_index).insert_child(head_name, head);
            }
            None => {
                let absent_parent = branch.absent_parent.unwrap_or_default();
                if self.root.node.is_none() {
                    self.root = Root {
                        absent_parent,
                        node: Some(head),
                    };
                } else {
                    // the root slot is taken, so this head is an orphan and
                    // must name the parent it is missing
                    if !absent_parent.is_initialised() {
                        return Err(GraphError::ParsingError);
                    }
                    self.insert_orphan(absent_parent, head_name, head);
                }
            }
        }

        let mut previous = head;
        for blob in branch.names.iter().skip(1) {
            let slab_index = self.checked_insert(blob.name(), Some(previous))?;
            self.get_node_mut_by_slab_index(previous).insert_child(blob.name(), slab_index);
            previous = slab_index;
        }
        *branch_index += 1;

        match last.forking_child_count {
            Some(forking_child_count) => {
                if forking_child_count < 2 {
                    return Err(GraphError::ParsingError);
                }
                for _ in 0..forking_child_count {
                    self.branch_from_wire(Some(previous), branches, branch_index)?;
                }
            }
            None => {
                self.tips_of_trees.insert(last.name(), previous);
            }
        }
        Ok(())
    }

    fn checked_insert(&mut self, name: VersionName, parent: Option<SlabIndex>) -> Result<SlabIndex> {
        // stored versions are always initialised and unique
        if !name.is_initialised() || self.contains_name(&name) {
            return Err(GraphError::ParsingError);
        }
        let node = match parent {
            Some(parent_index) => VersionNode::new_child(name, parent_index),
            None => VersionNode::new_head(name),
        };
        let slab_index = self.nodes.insert(node);
        self.index_map.insert(name, slab_index);
        Ok(slab_index)
    }

    /// Union-merges a serialised graph into this one: every edge of the
    /// incoming graph is replayed through [`VersionGraph::put`] in
    /// serialisation order. All-or-nothing: on any failure the graph is
    /// left untouched.
    pub fn apply_serialised(&mut self, bytes: &[u8]) -> Result<()> {
        let incoming = Self::from_bytes(bytes)?;
        debug!(versions = incoming.len(), "merging serialised graph");
        let mut merged = self.clone();
        if let Some(root_index) = incoming.root.node {
            incoming.apply_branch(incoming.root.absent_parent, root_index, &mut merged)?;
        }
        for (absent_parent, bucket) in &incoming.orphans {
            for &orphan_index in bucket.values() {
                incoming.apply_branch(*absent_parent, orphan_index, &mut merged)?;
            }
        }
        *self = merged;
        Ok(())
    }

    /// Replays the `(parent, version)` edges of one branch into `target`,
    /// recursing at forks in child-name order.
    fn apply_branch(
        &self,
        mut parent: VersionName,
        mut slab_index: SlabIndex,
        target: &mut VersionGraph,
    ) -> Result<()> {
        loop {
            let node = self.get_node_by_slab_index(slab_index);
            let name = node.get_name();
            target.put(&parent, &name)?;
            let children: Vec<SlabIndex> = node.get_children().values().copied().collect();
            match children.as_slice() {
                [] => return Ok(()),
                [only_child] => {
                    parent = name;
                    slab_index = *only_child;
                }
                forked => {
                    for &child in forked {
                        self.apply_branch(name, child, target)?;
                    }
                    return Ok(());
                }
            }
        }
    }
}
