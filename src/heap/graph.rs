use std::ops::Range;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{LeakError, Result};
use crate::primitives::dict::StringMap;
use crate::types::{EdgeIndex, EdgeType, NodeIndex, SnapshotEdgeType, StrId};

use super::source::{SnapshotChunk, SnapshotHeader, SnapshotSource};
use super::view::{Edge, Node};

/// Immutable, flat-array representation of one heap snapshot.
///
/// Node data lives in parallel arrays indexed by [`NodeIndex`]; edge data in
/// parallel arrays indexed by [`EdgeIndex`]. Node `i` owns the edge range
/// `first_edge_indexes[i]..first_edge_indexes[i + 1]`, and the trailing
/// sentinel equals the edge count.
pub struct HeapGraph {
    strings: Arc<StringMap>,
    node_types: Vec<u8>,
    node_names: Vec<u32>,
    node_sizes: Vec<u32>,
    first_edge_indexes: Vec<u32>,
    edge_types: Vec<u8>,
    edge_names_or_indexes: Vec<u32>,
    edge_to_nodes: Vec<u32>,
    root: NodeIndex,
}

/// Field offsets within node and edge records.
struct RecordLayout {
    node_width: usize,
    node_type: usize,
    node_name: usize,
    node_self_size: usize,
    node_edge_count: usize,
    edge_width: usize,
    edge_type: usize,
    edge_name_or_index: usize,
    edge_to_node: usize,
}

impl RecordLayout {
    fn from_header(header: &SnapshotHeader) -> Result<Self> {
        fn field(fields: &[String], name: &str, kind: &str) -> Result<usize> {
            fields
                .iter()
                .position(|f| f == name)
                .ok_or_else(|| LeakError::malformed(format!("{kind} fields lack `{name}`")))
        }
        let nodes = &header.node_fields;
        let edges = &header.edge_fields;
        Ok(Self {
            node_width: nodes.len(),
            node_type: field(nodes, "type", "node")?,
            node_name: field(nodes, "name", "node")?,
            node_self_size: field(nodes, "self_size", "node")?,
            node_edge_count: field(nodes, "edge_count", "node")?,
            edge_width: edges.len(),
            edge_type: field(edges, "type", "edge")?,
            edge_name_or_index: field(edges, "name_or_index", "edge")?,
            edge_to_node: field(edges, "to_node", "edge")?,
        })
    }
}

impl HeapGraph {
    /// Builds a graph by draining `source`.
    ///
    /// Names are resolved through `strings` only once the whole stream has been
    /// consumed, since string-table chunks may trail the records that reference
    /// them. On error nothing is interned.
    pub async fn build<S>(source: &mut S, strings: Arc<StringMap>) -> Result<Self>
    where
        S: SnapshotSource + ?Sized,
    {
        let header = match source.next_chunk().await? {
            Some(SnapshotChunk::Header(header)) => header,
            Some(other) => {
                return Err(LeakError::malformed(format!(
                    "first chunk is `{}`, expected the snapshot header",
                    other.kind()
                )))
            }
            None => return Err(LeakError::malformed("snapshot stream is empty")),
        };
        let layout = RecordLayout::from_header(&header)?;
        let node_count = header.node_count as usize;
        let edge_count = header.edge_count as usize;
        if node_count == 0 {
            return Err(LeakError::malformed("snapshot has no nodes"));
        }
        let root = match header.root_index {
            None => NodeIndex(0),
            Some(offset) => {
                let offset = offset as usize;
                if offset % layout.node_width != 0 || offset / layout.node_width >= node_count {
                    return Err(LeakError::malformed(format!(
                        "root offset {offset} does not address a node"
                    )));
                }
                NodeIndex((offset / layout.node_width) as u32)
            }
        };
        debug!(
            nodes = node_count,
            edges = edge_count,
            root = root.0,
            "heap.build.header"
        );

        let mut graph = HeapGraph {
            strings,
            node_types: vec![0; node_count],
            node_names: vec![0; node_count],
            node_sizes: vec![0; node_count],
            first_edge_indexes: vec![0; node_count + 1],
            edge_types: vec![0; edge_count],
            edge_names_or_indexes: vec![0; edge_count],
            edge_to_nodes: vec![0; edge_count],
            root,
        };

        let mut table: Vec<String> = Vec::new();
        let mut node_ptr = 0usize;
        let mut edge_ptr = 0usize;
        let mut next_edge = 0u64;
        while let Some(chunk) = source.next_chunk().await? {
            trace!(kind = chunk.kind(), "heap.build.chunk");
            match chunk {
                SnapshotChunk::Nodes(data) => {
                    let records = whole_records(&data, layout.node_width, "node")?;
                    if node_ptr + records > node_count {
                        return Err(LeakError::malformed(format!(
                            "more than the declared {node_count} nodes"
                        )));
                    }
                    for (i, record) in data.chunks_exact(layout.node_width).enumerate() {
                        let slot = node_ptr + i;
                        graph.node_types[slot] = type_code(record[layout.node_type], "node")?;
                        graph.node_names[slot] = record[layout.node_name];
                        graph.node_sizes[slot] = record[layout.node_self_size];
                        graph.first_edge_indexes[slot] = next_edge.min(u64::from(u32::MAX)) as u32;
                        next_edge += u64::from(record[layout.node_edge_count]);
                    }
                    node_ptr += records;
                }
                SnapshotChunk::Edges(data) => {
                    let records = whole_records(&data, layout.edge_width, "edge")?;
                    if edge_ptr + records > edge_count {
                        return Err(LeakError::malformed(format!(
                            "more than the declared {edge_count} edges"
                        )));
                    }
                    for (i, record) in data.chunks_exact(layout.edge_width).enumerate() {
                        let slot = edge_ptr + i;
                        let to = record[layout.edge_to_node] as usize;
                        if to % layout.node_width != 0 || to / layout.node_width >= node_count {
                            return Err(LeakError::malformed(format!(
                                "edge {slot} points at node offset {to}"
                            )));
                        }
                        graph.edge_types[slot] = type_code(record[layout.edge_type], "edge")?;
                        graph.edge_names_or_indexes[slot] = record[layout.edge_name_or_index];
                        graph.edge_to_nodes[slot] = (to / layout.node_width) as u32;
                    }
                    edge_ptr += records;
                }
                SnapshotChunk::Strings(mut slice) => table.append(&mut slice),
                SnapshotChunk::Header(_) => {
                    return Err(LeakError::malformed("duplicate snapshot header"))
                }
                SnapshotChunk::Unknown(kind) => {
                    return Err(LeakError::malformed(format!(
                        "unexpected snapshot chunk `{kind}`"
                    )))
                }
            }
        }
        if node_ptr != node_count || edge_ptr != edge_count {
            return Err(LeakError::malformed(format!(
                "stream ended after {node_ptr}/{node_count} nodes and {edge_ptr}/{edge_count} edges"
            )));
        }
        if next_edge != edge_count as u64 {
            return Err(LeakError::malformed(format!(
                "node edge counts sum to {next_edge}, header declares {edge_count}"
            )));
        }
        graph.first_edge_indexes[node_count] = edge_count as u32;

        graph.resolve_names(&table)?;
        debug!(
            nodes = node_count,
            edges = edge_count,
            strings = table.len(),
            interned = graph.strings.len(),
            "heap.build.done"
        );
        Ok(graph)
    }

    /// Rewrites raw string-table offsets into interned ids.
    ///
    /// Validates every reference before interning anything so a rejected
    /// snapshot leaves the shared map untouched.
    fn resolve_names(&mut self, table: &[String]) -> Result<()> {
        let missing = |what: &str, i: usize, slot: u32| {
            LeakError::malformed(format!(
                "{what} {i} names string {slot}, table has {}",
                table.len()
            ))
        };
        for (i, (&code, &slot)) in self
            .edge_types
            .iter()
            .zip(&self.edge_names_or_indexes)
            .enumerate()
        {
            match SnapshotEdgeType::from(code).edge_type() {
                Some(EdgeType::Index) => {}
                Some(EdgeType::Named) if (slot as usize) < table.len() => {}
                Some(EdgeType::Named) => return Err(missing("edge", i, slot)),
                None => {
                    return Err(LeakError::malformed(format!(
                        "edge {i} has unrecognized type {code}"
                    )))
                }
            }
        }
        if let Some(i) = self
            .node_names
            .iter()
            .position(|&slot| slot as usize >= table.len())
        {
            return Err(missing("node", i, self.node_names[i]));
        }

        let mut ids: Vec<Option<StrId>> = vec![None; table.len()];
        let strings = &self.strings;
        let mut intern = |slot: u32| -> u32 {
            let cached = &mut ids[slot as usize];
            cached
                .get_or_insert_with(|| strings.intern(&table[slot as usize]))
                .0
        };
        for (code, value) in self
            .edge_types
            .iter()
            .zip(self.edge_names_or_indexes.iter_mut())
        {
            if SnapshotEdgeType::from(*code).edge_type() == Some(EdgeType::Named) {
                *value = intern(*value);
            }
        }
        for name in self.node_names.iter_mut() {
            *name = intern(*name);
        }
        Ok(())
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.node_types.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edge_types.len()
    }

    /// Index of the snapshot root.
    pub fn root_index(&self) -> NodeIndex {
        self.root
    }

    /// View of the snapshot root.
    pub fn root(&self) -> Node<'_> {
        Node::new(self, self.root)
    }

    /// View of node `index`.
    pub fn node(&self, index: NodeIndex) -> Node<'_> {
        Node::new(self, index)
    }

    /// View of edge `index`.
    pub fn edge(&self, index: EdgeIndex) -> Edge<'_> {
        Edge::new(self, index)
    }

    /// The string map names are interned in.
    pub fn strings(&self) -> &Arc<StringMap> {
        &self.strings
    }

    /// Node-to-first-edge table, including the trailing sentinel.
    pub fn first_edge_indexes(&self) -> &[u32] {
        &self.first_edge_indexes
    }

    pub(crate) fn edge_range(&self, node: NodeIndex) -> Range<u32> {
        let i = node.as_usize();
        self.first_edge_indexes[i]..self.first_edge_indexes[i + 1]
    }

    pub(crate) fn node_type_code(&self, node: NodeIndex) -> u8 {
        self.node_types[node.as_usize()]
    }

    pub(crate) fn node_name_id(&self, node: NodeIndex) -> StrId {
        StrId(self.node_names[node.as_usize()])
    }

    pub(crate) fn node_size(&self, node: NodeIndex) -> u32 {
        self.node_sizes[node.as_usize()]
    }

    pub(crate) fn edge_type_code(&self, edge: EdgeIndex) -> u8 {
        self.edge_types[edge.as_usize()]
    }

    pub(crate) fn edge_name_or_index(&self, edge: EdgeIndex) -> u32 {
        self.edge_names_or_indexes[edge.as_usize()]
    }

    pub(crate) fn edge_to(&self, edge: EdgeIndex) -> NodeIndex {
        NodeIndex(self.edge_to_nodes[edge.as_usize()])
    }
}

fn whole_records(data: &[u32], width: usize, kind: &str) -> Result<usize> {
    if width == 0 || data.len() % width != 0 {
        return Err(LeakError::malformed(format!(
            "{kind} chunk of {} values is not a multiple of the record width {width}",
            data.len()
        )));
    }
    Ok(data.len() / width)
}

fn type_code(raw: u32, kind: &str) -> Result<u8> {
    u8::try_from(raw).map_err(|_| LeakError::malformed(format!("{kind} type code {raw} too large")))
}
