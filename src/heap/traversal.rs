//! Breadth-first walks over a [`HeapGraph`].
//!
//! Both walks pre-size their queues and visited sets from the graph's own
//! node and edge counts. Edge filters receive the node being expanded and the
//! candidate edge; returning `false` prunes the edge.

use crate::primitives::bits::OneBitArray;
use crate::types::{EdgeIndex, NodeIndex, SnapshotEdgeType};

use super::graph::HeapGraph;
use super::view::{Edge, Node};

/// Name of the synthetic node grouping DOM trees.
pub const DOM_TREES_ROOT: &str = "(Document DOM trees)";

/// Accepts every edge.
pub fn nop_filter(_node: Node<'_>, _edge: Edge<'_>) -> bool {
    true
}

/// Rejects weak edges, which do not retain their target.
pub fn non_weak_filter(_node: Node<'_>, edge: Edge<'_>) -> bool {
    edge.snapshot_type() != SnapshotEdgeType::Weak
}

/// Visits every node reachable from `initial` exactly once, in BFS order.
pub fn bfs_visitor<'g, V, F>(
    graph: &'g HeapGraph,
    initial: &[NodeIndex],
    mut visitor: V,
    mut filter: F,
) where
    V: FnMut(Node<'g>),
    F: FnMut(Node<'g>, Edge<'g>) -> bool,
{
    let mut visited = OneBitArray::new(graph.node_count());
    let mut queue: Vec<NodeIndex> = Vec::with_capacity(graph.node_count());
    for &start in initial {
        if visited.insert(start.as_usize()) {
            queue.push(start);
        }
    }
    let mut head = 0usize;
    while head < queue.len() {
        let node = graph.node(queue[head]);
        head += 1;
        visitor(node);
        for edge in node.edges() {
            let child = edge.to_index();
            if !visited.get(child.as_usize()) && filter(node, edge) {
                visited.set(child.as_usize(), true);
                queue.push(child);
            }
        }
    }
}

/// One queued edge and the queue slot of the edge that led to it.
#[derive(Clone, Copy)]
struct PathLink {
    prev: u32,
    edge: EdgeIndex,
}

/// Handle for reconstructing the path to the edge currently being visited.
///
/// Paths are stored as back-links between queue slots, so materializing one
/// costs time proportional to its length and nothing is stored per path.
pub struct EdgePath<'a> {
    links: &'a [PathLink],
    slot: usize,
}

impl EdgePath<'_> {
    /// Edges from the walk's starting edge to the current edge, inclusive.
    pub fn edges(&self) -> Vec<EdgeIndex> {
        let mut path = Vec::new();
        let mut slot = self.slot;
        while slot != ROOT_SLOT {
            let link = self.links[slot];
            path.push(link.edge);
            slot = link.prev as usize;
        }
        path.reverse();
        path
    }

    /// Number of edges in the path.
    pub fn len(&self) -> usize {
        let mut len = 0;
        let mut slot = self.slot;
        while slot != ROOT_SLOT {
            len += 1;
            slot = self.links[slot].prev as usize;
        }
        len
    }

    /// Returns `true` if the handle points at the root slot, which carries no edge.
    pub fn is_empty(&self) -> bool {
        self.slot == ROOT_SLOT
    }
}

const ROOT_SLOT: usize = 0;

/// Visits every edge reachable from the `initial` edges exactly once, in BFS order.
///
/// Because visited state is tracked per edge rather than per node, a node
/// reachable along several distinct edges is reported once per incoming edge,
/// each with its own path.
pub fn bfs_edge_visitor<'g, V, F>(
    graph: &'g HeapGraph,
    initial: &[EdgeIndex],
    mut visitor: V,
    mut filter: F,
) where
    V: FnMut(Edge<'g>, &EdgePath<'_>),
    F: FnMut(Node<'g>, Edge<'g>) -> bool,
{
    let mut visited = OneBitArray::new(graph.edge_count());
    let mut links: Vec<PathLink> = Vec::with_capacity(graph.edge_count() + 1);
    // Slot 0 terminates every back-link chain.
    links.push(PathLink {
        prev: ROOT_SLOT as u32,
        edge: EdgeIndex(0),
    });
    for &start in initial {
        if visited.insert(start.as_usize()) {
            links.push(PathLink {
                prev: ROOT_SLOT as u32,
                edge: start,
            });
        }
    }
    let mut head = 1usize;
    while head < links.len() {
        let slot = head;
        head += 1;
        let edge = graph.edge(links[slot].edge);
        visitor(
            edge,
            &EdgePath {
                links: &links,
                slot,
            },
        );
        let node = edge.to();
        for child in node.edges() {
            if !visited.get(child.index().as_usize()) && filter(node, child) {
                visited.set(child.index().as_usize(), true);
                links.push(PathLink {
                    prev: slot as u32,
                    edge: child.index(),
                });
            }
        }
    }
}

impl HeapGraph {
    /// Non-synthetic children of the root (global objects).
    pub fn global_root_indices(&self) -> Vec<NodeIndex> {
        self.root()
            .edges()
            .map(|e| e.to())
            .filter(|n| !n.is_synthetic())
            .map(|n| n.index())
            .collect()
    }

    /// Global objects plus the DOM trees root.
    pub fn user_root_indices(&self) -> Vec<NodeIndex> {
        self.root()
            .edges()
            .map(|e| e.to())
            .filter(|n| !n.is_synthetic() || n.name() == DOM_TREES_ROOT)
            .map(|n| n.index())
            .collect()
    }

    /// Edges from the root to global objects.
    pub fn global_root_edges(&self) -> Vec<EdgeIndex> {
        self.root()
            .edges()
            .filter(|e| !e.to().is_synthetic())
            .map(|e| e.index())
            .collect()
    }

    /// Walks everything reachable from the root.
    pub fn visit_root<'g, V, F>(&'g self, visitor: V, filter: F)
    where
        V: FnMut(Node<'g>),
        F: FnMut(Node<'g>, Edge<'g>) -> bool,
    {
        bfs_visitor(self, &[self.root_index()], visitor, filter);
    }

    /// Walks everything reachable from the user roots.
    pub fn visit_user_roots<'g, V, F>(&'g self, visitor: V, filter: F)
    where
        V: FnMut(Node<'g>),
        F: FnMut(Node<'g>, Edge<'g>) -> bool,
    {
        bfs_visitor(self, &self.user_root_indices(), visitor, filter);
    }

    /// Walks everything reachable from the global objects.
    pub fn visit_global_roots<'g, V, F>(&'g self, visitor: V, filter: F)
    where
        V: FnMut(Node<'g>),
        F: FnMut(Node<'g>, Edge<'g>) -> bool,
    {
        bfs_visitor(self, &self.global_root_indices(), visitor, filter);
    }

    /// Walks every edge reachable from the root-to-global edges, with paths.
    pub fn visit_global_edges<'g, V, F>(&'g self, visitor: V, filter: F)
    where
        V: FnMut(Edge<'g>, &EdgePath<'_>),
        F: FnMut(Node<'g>, Edge<'g>) -> bool,
    {
        bfs_edge_visitor(self, &self.global_root_edges(), visitor, filter);
    }
}
