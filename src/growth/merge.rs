use rustc_hash::FxHashMap;

use crate::heap::{Edge, HeapGraph, Node};
use crate::primitives::bits::{OneBitArray, TwoBitArray};
use crate::types::{EdgeIndex, NodeIndex, StrId};

use super::policy::should_traverse;
use super::status::GrowthStatus;

/// Structural identity of a child edge relative to its parent.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
enum ChildKey {
    Name(StrId),
    Index(u32),
}

/// Children of synthetic nodes are keyed by the child's name, since root
/// buckets are not reliably ordered between snapshots.
fn child_key(parent: Node<'_>, edge: Edge<'_>) -> ChildKey {
    if parent.is_synthetic() {
        return ChildKey::Name(edge.to().name_id());
    }
    match edge.name_id() {
        Some(id) => ChildKey::Name(id),
        None => ChildKey::Index(edge.raw_name_or_index()),
    }
}

/// Outcome counters for one merge.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MergeStats {
    /// Node pairs matched and compared.
    pub pairs_visited: usize,
    /// New nodes promoted to `Growing`.
    pub growing: usize,
}

/// Walks `old` and `new` in lockstep from their roots, matching children by
/// [`ChildKey`], and promotes matched new nodes whose property count grew
/// while their old counterpart was still `New` or `Growing`.
///
/// `new_status` must arrive filled with `NotGrowing`. Each new node is paired
/// at most once.
pub(crate) fn merge_graphs(
    old: &HeapGraph,
    old_status: &TwoBitArray<GrowthStatus>,
    new: &HeapGraph,
    new_status: &mut TwoBitArray<GrowthStatus>,
) -> MergeStats {
    let mut stats = MergeStats::default();
    let mut visited = OneBitArray::new(new.node_count());
    let mut queue: Vec<(NodeIndex, NodeIndex)> = Vec::with_capacity(new.node_count());
    let mut old_edges: FxHashMap<ChildKey, EdgeIndex> = FxHashMap::default();

    visited.set(new.root_index().as_usize(), true);
    queue.push((old.root_index(), new.root_index()));
    let mut head = 0usize;
    while head < queue.len() {
        let (old_index, new_index) = queue[head];
        head += 1;
        stats.pairs_visited += 1;
        let old_node = old.node(old_index);
        let new_node = new.node(new_index);

        if old_status.get(old_index.as_usize()).can_grow()
            && old_node.num_properties() < new_node.num_properties()
        {
            new_status.set(new_index.as_usize(), GrowthStatus::Growing);
            stats.growing += 1;
        }

        old_edges.clear();
        for edge in old_node.edges() {
            old_edges.insert(child_key(old_node, edge), edge.index());
        }
        if old_edges.is_empty() {
            continue;
        }

        for new_edge in new_node.edges() {
            let new_child = new_edge.to_index();
            if visited.get(new_child.as_usize()) {
                continue;
            }
            let Some(&old_edge) = old_edges.get(&child_key(new_node, new_edge)) else {
                continue;
            };
            let old_edge = old.edge(old_edge);
            if should_traverse(old_edge, false) && should_traverse(new_edge, false) {
                visited.set(new_child.as_usize(), true);
                queue.push((old_edge.to_index(), new_child));
            }
        }
    }
    stats
}
