//! In-memory heap snapshot graphs.
//!
//! A [`HeapGraph`] is built once from a chunked [`SnapshotSource`] and is
//! immutable afterwards. [`Node`] and [`Edge`] are borrowed views over its flat
//! arrays; the [`traversal`] module provides node- and edge-level
//! breadth-first walks with pluggable edge filters.

mod builder;
mod graph;
mod source;
mod summary;
pub mod traversal;
mod view;

pub use builder::SnapshotBuilder;
pub use graph::HeapGraph;
pub use source::{
    chunk_channel, from_chunks, ChunkReceiver, SnapshotChunk, SnapshotHeader, SnapshotSource,
};
pub use summary::SizeSummary;
pub use traversal::{EdgePath, DOM_TREES_ROOT};
pub use view::{Edge, EdgeIter, Node};
