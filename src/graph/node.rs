//! Implementation of [`VersionNode`]

use std::collections::BTreeMap;

use crate::types::VersionName;

use super::SlabIndex;

/// A stored version in the arena of [`super::VersionGraph`].
#[derive(Debug, Clone)]
pub(super) struct VersionNode {
    name: VersionName,

    /// The arena handle of this version's parent.
    /// `None` means the version heads its component: it is either the root
    /// of the graph or an orphan.
    parent: Option<SlabIndex>,

    /// Children keyed by their name, so iteration is name-ordered and
    /// insertion is duplicate-free.
    children: BTreeMap<VersionName, SlabIndex>,
}

impl VersionNode {
    /// Creates a version heading its component (no stored parent).
    pub fn new_head(name: VersionName) -> Self {
        VersionNode {
            name,
            parent: None,
            children: BTreeMap::new(),
        }
    }

    /// Creates a version attached under a stored parent.
    pub fn new_child(name: VersionName, parent: SlabIndex) -> Self {
        VersionNode {
            name,
            parent: Some(parent),
            children: BTreeMap::new(),
        }
    }

    pub fn get_name(&self) -> VersionName {
        self.name
    }

    pub fn get_parent(&self) -> Option<SlabIndex> {
        self.parent
    }

    pub fn set_parent(&mut self, parent: SlabIndex) {
        self.parent = Some(parent);
    }

    /// Clears the parent link, making this version head its component.
    pub fn set_as_head(&mut self) {
        self.parent = None;
    }

    pub fn get_children(&self) -> &BTreeMap<VersionName, SlabIndex> {
        &self.children
    }

    pub fn insert_child(&mut self, name: VersionName, child: SlabIndex) {
        let previous = self.children.insert(name, child);
        debug_assert!(previous.is_none());
    }

    pub fn remove_child(&mut self, name: &VersionName) {
        let removed = self.children.remove(name);
        debug_assert!(removed.is_some());
    }
}
