//! Leak detection over sequences of V8 heap snapshots.
//!
//! Snapshots arrive as ordered chunk streams ([`heap::SnapshotSource`]) and are
//! built into compact, immutable [`heap::HeapGraph`]s. A
//! [`growth::HeapGrowthTracker`] merges each new graph against the previous
//! one, keeps the set of objects whose property count grew every time, and
//! reports them with their access paths and retained sizes. The [`report`]
//! module renders those results for people and tools.

#![warn(missing_docs)]

pub mod error;
pub mod growth;
pub mod heap;
pub mod logging;
pub mod primitives;
pub mod report;
pub mod types;

pub use error::{LeakError, Result};
pub use growth::{GrowthObject, GrowthStatus, HeapGrowthTracker, TrackerOptions};
pub use heap::{Edge, HeapGraph, Node, SnapshotChunk, SnapshotHeader, SnapshotSource};
pub use primitives::dict::StringMap;
pub use types::{
    EdgeIndex, EdgeType, IndexOrName, NodeIndex, SnapshotEdgeType, SnapshotNodeType, StrId,
};
