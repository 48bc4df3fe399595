use serde::{Deserialize, Serialize};

use crate::types::SnapshotNodeType;

use super::graph::HeapGraph;
use super::traversal::non_weak_filter;

/// Per-category byte totals over the user-reachable part of one snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeSummary {
    /// Nodes in the snapshot.
    pub num_nodes: u64,
    /// Edges in the snapshot.
    pub num_edges: u64,
    /// Sum of every category below.
    pub total_size: u64,
    /// Hidden VM objects.
    pub hidden_size: u64,
    /// Arrays and backing stores.
    pub array_size: u64,
    /// Flat strings.
    pub string_size: u64,
    /// Plain objects.
    pub object_size: u64,
    /// Compiled code.
    pub code_size: u64,
    /// Closures.
    pub closure_size: u64,
    /// Regular expressions.
    pub regexp_size: u64,
    /// Boxed numbers.
    pub heap_number_size: u64,
    /// Native (embedder) objects.
    pub native_size: u64,
    /// Synthetic grouping nodes.
    pub synthetic_size: u64,
    /// Concatenated strings.
    pub cons_string_size: u64,
    /// Sliced strings.
    pub sliced_string_size: u64,
    /// Symbols.
    pub symbol_size: u64,
    /// BigInts and codes outside the vocabulary.
    pub unknown_size: u64,
}

impl HeapGraph {
    /// Sums self sizes by node category over everything reachable from the
    /// user roots, ignoring weak edges.
    pub fn calculate_size(&self) -> SizeSummary {
        let mut rv = SizeSummary {
            num_nodes: self.node_count() as u64,
            num_edges: self.edge_count() as u64,
            ..SizeSummary::default()
        };
        self.visit_user_roots(
            |n| {
                let size = u64::from(n.self_size());
                rv.total_size += size;
                let bucket = match n.node_type() {
                    SnapshotNodeType::Array => &mut rv.array_size,
                    SnapshotNodeType::Closure => &mut rv.closure_size,
                    SnapshotNodeType::Code => &mut rv.code_size,
                    SnapshotNodeType::ConsString => &mut rv.cons_string_size,
                    SnapshotNodeType::HeapNumber => &mut rv.heap_number_size,
                    SnapshotNodeType::Hidden => &mut rv.hidden_size,
                    SnapshotNodeType::Native => &mut rv.native_size,
                    SnapshotNodeType::Object => &mut rv.object_size,
                    SnapshotNodeType::RegExp => &mut rv.regexp_size,
                    SnapshotNodeType::SlicedString => &mut rv.sliced_string_size,
                    SnapshotNodeType::String => &mut rv.string_size,
                    SnapshotNodeType::Symbol => &mut rv.symbol_size,
                    SnapshotNodeType::Synthetic => &mut rv.synthetic_size,
                    SnapshotNodeType::BigInt | SnapshotNodeType::Unknown(_) => &mut rv.unknown_size,
                };
                *bucket += size;
            },
            non_weak_filter,
        );
        rv
    }
}
