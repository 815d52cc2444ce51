use std::fmt;

use ethereum_types::H512;
use static_assertions::const_assert_eq;

/// Opaque 64-byte content identifier of a version.
///
/// The all-zero value is reserved to mean "uninitialised" and never names a
/// stored version.
pub type VersionId = H512;

const_assert_eq!(std::mem::size_of::<VersionId>(), 64);

/// Name of a version: an `(index, id)` pair, ordered lexicographically.
///
/// The index carries the caller-assigned position in the object's history;
/// the id is the content identifier of the snapshot. The default name is
/// uninitialised and denotes "no parent" when putting the first root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionName {
    pub index: u64,
    pub id: VersionId,
}

impl VersionName {
    pub fn new(index: u64, id: VersionId) -> Self {
        VersionName { index, id }
    }

    /// An initialised name carries a non-zero id.
    pub fn is_initialised(&self) -> bool {
        !self.id.is_zero()
    }
}

impl Default for VersionName {
    fn default() -> Self {
        VersionName {
            index: u64::MAX,
            id: VersionId::zero(),
        }
    }
}

impl fmt::Display for VersionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_initialised() {
            let id = self.id.as_bytes();
            write!(f, "{}-{:02x}{:02x}{:02x}", self.index, id[0], id[1], id[2])
        } else {
            write!(f, "{}-uninitialised", self.index)
        }
    }
}
