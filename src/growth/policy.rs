use crate::heap::traversal::{non_weak_filter, DOM_TREES_ROOT};
use crate::heap::{Edge, Node};
use crate::types::SnapshotEdgeType;

/// Internal edges known to hold script-visible state.
const FOLLOWED_INTERNAL_EDGES: [&str; 4] = ["elements", "table", "properties", "context"];

/// Prefix of native node names belonging to a DOM tree.
const DOM_NODE_PREFIX: &str = "Document DOM";

/// Reachability policy shared by the merge walk and growth-path discovery.
///
/// `<symbol>` edges are skipped because several properties on one object can
/// share that name and cannot be told apart across snapshots. Internal edges
/// are followed only through the backing stores that carry user data (and,
/// with `include_dom`, into DOM trees). Synthetic nodes other than the DOM
/// trees root are never entered.
pub fn should_traverse(edge: Edge<'_>, include_dom: bool) -> bool {
    let name = edge.name();
    if name == Some("<symbol>") {
        return false;
    }
    if edge.snapshot_type() == SnapshotEdgeType::Internal {
        match name {
            Some(n) if FOLLOWED_INTERNAL_EDGES.contains(&n) => true,
            _ => include_dom && edge.to().name().starts_with(DOM_NODE_PREFIX),
        }
    } else {
        let to = edge.to();
        !to.is_synthetic() || to.name() == DOM_TREES_ROOT
    }
}

/// Non-weak edges passing [`should_traverse`] without DOM.
pub fn filter_no_dom(node: Node<'_>, edge: Edge<'_>) -> bool {
    non_weak_filter(node, edge) && should_traverse(edge, false)
}

/// Non-weak edges passing [`should_traverse`] with DOM.
pub fn filter_include_dom(node: Node<'_>, edge: Edge<'_>) -> bool {
    non_weak_filter(node, edge) && should_traverse(edge, true)
}
