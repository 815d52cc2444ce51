//! Wire form of the serialised graph.
//!
//! A graph serialises to `(max_versions, max_branches, branches)`. Each
//! branch is a linear run of versions. A version with two or more children
//! closes its branch with a `forking_child_count` and the children's
//! branches follow immediately, depth-first in child-name order. A branch
//! head records the `absent_parent` name kept for the root or for the
//! orphan bucket it came from; continuation branches of a fork record none.

use crate::codec::{Decode, Encode};
use crate::errors::DecResult;
use crate::types::{VersionId, VersionName};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct WireVersion {
    pub index: u64,
    pub id: VersionId,
    /// Present exactly at forks. Absent means the branch continues past
    /// this version, or terminates when this is the last blob.
    pub forking_child_count: Option<u32>,
}

impl WireVersion {
    pub fn name(&self) -> VersionName {
        VersionName::new(self.index, self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct WireBranch {
    pub absent_parent: Option<VersionName>,
    pub names: Vec<WireVersion>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct WireGraph {
    pub max_versions: u32,
    pub max_branches: u32,
    pub branches: Vec<WireBranch>,
}

impl Encode for WireVersion {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.index.encode(buf);
        self.id.encode(buf);
        self.forking_child_count.encode(buf);
    }
}

impl Decode for WireVersion {
    fn decode(input: &mut &[u8]) -> DecResult<Self> {
        Ok(WireVersion {
            index: u64::decode(input)?,
            id: VersionId::decode(input)?,
            forking_child_count: Option::<u32>::decode(input)?,
        })
    }
}

impl Encode for WireBranch {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.absent_parent.encode(buf);
        self.names.encode(buf);
    }
}

impl Decode for WireBranch {
    fn decode(input: &mut &[u8]) -> DecResult<Self> {
        Ok(WireBranch {
            absent_parent: Option::<VersionName>::decode(input)?,
            names: Vec::<WireVersion>::decode(input)?,
        })
    }
}

impl Encode for WireGraph {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.max_versions.encode(buf);
        self.max_branches.encode(buf);
        self.branches.encode(buf);
    }
}

impl Decode for WireGraph {
    fn decode(input: &mut &[u8]) -> DecResult<Self> {
        Ok(WireGraph {
            max_versions: u32::decode(input)?,
            max_branches: u32::decode(input)?,
            branches: Vec::<WireBranch>::decode(input)?,
        })
    }
}
