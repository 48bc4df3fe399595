use std::fmt;
use std::ops::Range;

use crate::error::{LeakError, Result};
use crate::types::{
    EdgeIndex, EdgeType, IndexOrName, NodeIndex, SnapshotEdgeType, SnapshotNodeType, StrId,
};

use super::graph::HeapGraph;

/// Slots assumed per word of an elements backing store.
const ELEMENT_SLOT_BYTES: u32 = 8;

/// Zero-copy view of one node in a [`HeapGraph`].
#[derive(Clone, Copy)]
pub struct Node<'g> {
    graph: &'g HeapGraph,
    index: NodeIndex,
}

impl<'g> Node<'g> {
    pub(crate) fn new(graph: &'g HeapGraph, index: NodeIndex) -> Self {
        debug_assert!(index.as_usize() < graph.node_count());
        Self { graph, index }
    }

    /// Index of this node within its graph.
    pub fn index(&self) -> NodeIndex {
        self.index
    }

    /// Snapshot-level node kind.
    pub fn node_type(&self) -> SnapshotNodeType {
        SnapshotNodeType::from(self.graph.node_type_code(self.index))
    }

    /// Returns `true` for grouping nodes introduced by the snapshot format.
    pub fn is_synthetic(&self) -> bool {
        self.node_type() == SnapshotNodeType::Synthetic
    }

    /// Bytes held directly by this node.
    pub fn self_size(&self) -> u32 {
        self.graph.node_size(self.index)
    }

    /// Interned id of this node's name.
    pub fn name_id(&self) -> StrId {
        self.graph.node_name_id(self.index)
    }

    /// Node name (constructor name, string contents, root label, ...).
    pub fn name(&self) -> &'g str {
        self.graph
            .strings()
            .resolve(self.name_id())
            .unwrap_or_default()
    }

    /// First edge index owned by this node.
    pub fn edge_start(&self) -> EdgeIndex {
        EdgeIndex(self.graph.edge_range(self.index).start)
    }

    /// Number of outgoing edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_range(self.index).len()
    }

    /// Returns `true` when the node has outgoing edges.
    pub fn has_children(&self) -> bool {
        self.edge_count() != 0
    }

    /// Iterates outgoing edges in snapshot order.
    pub fn edges(&self) -> EdgeIter<'g> {
        EdgeIter {
            graph: self.graph,
            range: self.graph.edge_range(self.index),
        }
    }

    /// Returns the `i`-th outgoing edge.
    pub fn child(&self, i: usize) -> Result<Edge<'g>> {
        let range = self.graph.edge_range(self.index);
        if i >= range.len() {
            return Err(LeakError::OutOfRange {
                index: i,
                len: range.len(),
            });
        }
        Ok(Edge::new(self.graph, EdgeIndex(range.start + i as u32)))
    }

    /// Estimates the number of script-visible properties on this node.
    ///
    /// Counts ordinary edges once each and looks through the `elements`,
    /// `table` and `properties` backing stores, which hold indexed elements,
    /// Map/Set entries and out-of-object properties respectively. This is the
    /// growth metric compared across snapshots.
    pub fn num_properties(&self) -> usize {
        let mut count = 0usize;
        for child in self.edges() {
            match child.snapshot_type() {
                SnapshotEdgeType::Internal => match child.name() {
                    Some("elements") => {
                        let elements = child.to();
                        // Only flat stores; anything with children is counted elsewhere.
                        if !elements.has_children() {
                            count += (elements.self_size() / ELEMENT_SLOT_BYTES) as usize;
                        }
                    }
                    Some("table") | Some("properties") => count += child.to().edge_count(),
                    _ => {}
                },
                SnapshotEdgeType::Hidden | SnapshotEdgeType::Shortcut | SnapshotEdgeType::Weak => {}
                _ => count += 1,
            }
        }
        count
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.graph, other.graph) && self.index == other.index
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("index", &self.index.0)
            .field("type", &self.node_type())
            .field("name", &self.name())
            .field("self_size", &self.self_size())
            .finish()
    }
}

/// Zero-copy view of one edge in a [`HeapGraph`].
#[derive(Clone, Copy)]
pub struct Edge<'g> {
    graph: &'g HeapGraph,
    index: EdgeIndex,
}

impl<'g> Edge<'g> {
    pub(crate) fn new(graph: &'g HeapGraph, index: EdgeIndex) -> Self {
        debug_assert!(index.as_usize() < graph.edge_count());
        Self { graph, index }
    }

    /// Index of this edge within its graph.
    pub fn index(&self) -> EdgeIndex {
        self.index
    }

    /// Destination node.
    pub fn to(&self) -> Node<'g> {
        Node::new(self.graph, self.to_index())
    }

    /// Destination node index.
    pub fn to_index(&self) -> NodeIndex {
        self.graph.edge_to(self.index)
    }

    /// Snapshot-level edge kind.
    pub fn snapshot_type(&self) -> SnapshotEdgeType {
        SnapshotEdgeType::from(self.graph.edge_type_code(self.index))
    }

    /// Whether this edge is addressed by index or by name.
    pub fn edge_type(&self) -> Result<EdgeType> {
        let kind = self.snapshot_type();
        kind.edge_type()
            .ok_or(LeakError::UnrecognizedEdgeType(kind.code()))
    }

    /// Raw index for index edges, resolved name for named edges.
    pub fn index_or_name(&self) -> Result<IndexOrName<'g>> {
        let raw = self.graph.edge_name_or_index(self.index);
        Ok(match self.edge_type()? {
            EdgeType::Index => IndexOrName::Index(raw),
            EdgeType::Named => IndexOrName::Name(
                self.graph
                    .strings()
                    .resolve(StrId(raw))
                    .unwrap_or_default(),
            ),
        })
    }

    /// Interned name id for named edges.
    pub fn name_id(&self) -> Option<StrId> {
        match self.snapshot_type().edge_type() {
            Some(EdgeType::Named) => Some(StrId(self.graph.edge_name_or_index(self.index))),
            _ => None,
        }
    }

    /// Resolved name for named edges; `None` for index edges.
    pub fn name(&self) -> Option<&'g str> {
        self.name_id()
            .and_then(|id| self.graph.strings().resolve(id))
    }

    pub(crate) fn raw_name_or_index(&self) -> u32 {
        self.graph.edge_name_or_index(self.index)
    }
}

impl PartialEq for Edge<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.graph, other.graph) && self.index == other.index
    }
}

impl Eq for Edge<'_> {}

impl fmt::Debug for Edge<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Edge")
            .field("index", &self.index.0)
            .field("type", &self.snapshot_type())
            .field("name_or_index", &self.raw_name_or_index())
            .field("to", &self.to_index().0)
            .finish()
    }
}

/// Iterator over a contiguous edge range.
#[derive(Clone)]
pub struct EdgeIter<'g> {
    graph: &'g HeapGraph,
    range: Range<u32>,
}

impl<'g> Iterator for EdgeIter<'g> {
    type Item = Edge<'g>;

    fn next(&mut self) -> Option<Self::Item> {
        self.range
            .next()
            .map(|i| Edge::new(self.graph, EdgeIndex(i)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.range.size_hint()
    }
}

impl ExactSizeIterator for EdgeIter<'_> {}
