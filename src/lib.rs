//! Bounded, versioned history DAG of a mutable, content-addressed object.
//!
//! [`VersionGraph`] stores immutable version snapshots linked by
//! derived-from edges. Versions may arrive in any order (children before
//! their parents), while the graph keeps a single root, tracks branch tips,
//! enforces version and branch limits with deterministic eviction, and
//! round-trips through a canonical byte form that can also be union-merged
//! into another graph.

#[macro_use]
extern crate tracing;

pub mod codec;
pub mod errors;
mod graph;
mod types;

pub use errors::{DecodeError, GraphError, Result};
pub use graph::VersionGraph;
pub use types::{VersionId, VersionName};
