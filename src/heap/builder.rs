use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::primitives::dict::StringMap;
use crate::types::{NodeIndex, SnapshotEdgeType, SnapshotNodeType};

use super::graph::HeapGraph;
use super::source::{from_chunks, SnapshotChunk, SnapshotHeader};

const NODE_FIELDS: usize = 6;

struct PendingEdge {
    kind: SnapshotEdgeType,
    name_or_index: u32,
    to: NodeIndex,
}

struct PendingNode {
    kind: SnapshotNodeType,
    name: u32,
    self_size: u32,
    edges: Vec<PendingEdge>,
}

/// Produces well-formed snapshot chunk streams from an in-memory description.
///
/// Records use the standard V8 layouts. Edges are emitted grouped by their
/// owning node in insertion order, so edge indices in the resulting graph
/// follow node order first. Useful for synthetic snapshots and tests.
#[derive(Default)]
pub struct SnapshotBuilder {
    nodes: Vec<PendingNode>,
    strings: Vec<String>,
    string_slots: FxHashMap<String, u32>,
    root: Option<NodeIndex>,
    records_per_chunk: Option<usize>,
    strings_first: bool,
}

impl SnapshotBuilder {
    /// Creates an empty builder. The first node added is the root unless
    /// [`Self::root`] says otherwise.
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits node and edge data into chunks of at most `records` records.
    pub fn records_per_chunk(mut self, records: usize) -> Self {
        self.records_per_chunk = Some(records.max(1));
        self
    }

    /// Emits the string table before the record chunks instead of after.
    pub fn strings_first(mut self, enabled: bool) -> Self {
        self.strings_first = enabled;
        self
    }

    /// Marks `node` as the snapshot root.
    pub fn root(&mut self, node: NodeIndex) -> &mut Self {
        self.root = Some(node);
        self
    }

    /// Adds a node and returns its index.
    pub fn node(&mut self, kind: SnapshotNodeType, name: &str, self_size: u32) -> NodeIndex {
        let name = self.string_slot(name);
        self.nodes.push(PendingNode {
            kind,
            name,
            self_size,
            edges: Vec::new(),
        });
        NodeIndex((self.nodes.len() - 1) as u32)
    }

    /// Adds an edge whose `name_or_index` field is a raw number.
    pub fn edge(
        &mut self,
        from: NodeIndex,
        kind: SnapshotEdgeType,
        index: u32,
        to: NodeIndex,
    ) -> &mut Self {
        self.push_edge(from, kind, index, to)
    }

    /// Adds an edge whose `name_or_index` field names a string.
    pub fn named(
        &mut self,
        from: NodeIndex,
        kind: SnapshotEdgeType,
        name: &str,
        to: NodeIndex,
    ) -> &mut Self {
        let slot = self.string_slot(name);
        self.push_edge(from, kind, slot, to)
    }

    /// Adds a named property edge.
    pub fn property(&mut self, from: NodeIndex, name: &str, to: NodeIndex) -> &mut Self {
        self.named(from, SnapshotEdgeType::Property, name, to)
    }

    /// Number of nodes added so far.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Renders the chunk sequence, header first.
    pub fn chunks(&self) -> Vec<SnapshotChunk> {
        let edge_count: usize = self.nodes.iter().map(|n| n.edges.len()).sum();
        let mut header = SnapshotHeader::v8(self.nodes.len() as u32, edge_count as u32);
        header.root_index = self.root.map(|r| r.0 * NODE_FIELDS as u32);

        let mut node_data = Vec::with_capacity(self.nodes.len() * NODE_FIELDS);
        let mut edge_data = Vec::with_capacity(edge_count * 3);
        for (i, node) in self.nodes.iter().enumerate() {
            node_data.extend_from_slice(&[
                u32::from(node.kind.code()),
                node.name,
                (i as u32) * 2 + 1,
                node.self_size,
                node.edges.len() as u32,
                0,
            ]);
            for edge in &node.edges {
                edge_data.extend_from_slice(&[
                    u32::from(edge.kind.code()),
                    edge.name_or_index,
                    edge.to.0 * NODE_FIELDS as u32,
                ]);
            }
        }

        let mut chunks = vec![SnapshotChunk::Header(header)];
        if self.strings_first {
            chunks.push(SnapshotChunk::Strings(self.strings.clone()));
        }
        let per = self.records_per_chunk.unwrap_or(usize::MAX);
        for part in node_data.chunks(per.saturating_mul(NODE_FIELDS)) {
            chunks.push(SnapshotChunk::Nodes(part.to_vec()));
        }
        for part in edge_data.chunks(per.saturating_mul(3)) {
            chunks.push(SnapshotChunk::Edges(part.to_vec()));
        }
        if !self.strings_first {
            // Two halves so consumers see a split table.
            let mid = self.strings.len() / 2;
            chunks.push(SnapshotChunk::Strings(self.strings[..mid].to_vec()));
            chunks.push(SnapshotChunk::Strings(self.strings[mid..].to_vec()));
        }
        chunks
    }

    /// Builds a [`HeapGraph`] from the rendered chunks.
    pub async fn build(&self, strings: Arc<StringMap>) -> Result<HeapGraph> {
        HeapGraph::build(&mut from_chunks(self.chunks()), strings).await
    }

    fn push_edge(
        &mut self,
        from: NodeIndex,
        kind: SnapshotEdgeType,
        name_or_index: u32,
        to: NodeIndex,
    ) -> &mut Self {
        self.nodes[from.as_usize()].edges.push(PendingEdge {
            kind,
            name_or_index,
            to,
        });
        self
    }

    fn string_slot(&mut self, s: &str) -> u32 {
        if let Some(&slot) = self.string_slots.get(s) {
            return slot;
        }
        let slot = self.strings.len() as u32;
        self.strings.push(s.to_owned());
        self.string_slots.insert(s.to_owned(), slot);
        slot
    }
}
