//! Reader-facing renderings of growth reports.
//!
//! Paths are filtered down to edges a developer can act on: hidden and
//! shortcut edges disappear, and the only internal edge kept is a closure's
//! `context`, which stands for the captured scope.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::growth::GrowthObject;
use crate::heap::{Edge, HeapGraph};
use crate::types::{EdgeIndex, EdgeType, IndexOrName, SnapshotEdgeType};

/// Key under which closure scopes appear in a [`GrowingPathTree`].
pub const SCOPE_KEY: &str = "__scope__";

fn is_visible(edge: Edge<'_>) -> bool {
    match edge.snapshot_type() {
        SnapshotEdgeType::Internal => edge.name() == Some("context"),
        SnapshotEdgeType::Hidden | SnapshotEdgeType::Shortcut => false,
        _ => true,
    }
}

fn escape_quotes(s: &str) -> String {
    s.replace('\'', "\\'")
}

/// Renders a path as a property access expression, e.g. `global['a']['0']`.
pub fn path_to_string(graph: &HeapGraph, path: &[EdgeIndex]) -> Result<String> {
    let mut rv = String::from("global");
    for edge in path.iter().map(|&e| graph.edge(e)).filter(|&e| is_visible(e)) {
        let key = edge.index_or_name()?.to_string();
        rv.push_str("['");
        rv.push_str(&escape_quotes(&key));
        rv.push_str("']");
    }
    Ok(rv)
}

/// Step label in a [`GrowingPathTree`]; serialized as a bare number or string.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathKey {
    /// Element or hidden slot index.
    Index(u32),
    /// Property, variable, or [`SCOPE_KEY`].
    Name(String),
}

impl From<IndexOrName<'_>> for PathKey {
    fn from(value: IndexOrName<'_>) -> Self {
        match value {
            IndexOrName::Index(i) => PathKey::Index(i),
            IndexOrName::Name(n) => PathKey::Name(n.to_owned()),
        }
    }
}

/// One step of the merged path tree over every growing object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowingPathTree {
    /// How `index_or_name` is interpreted.
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    /// Property name, element index, or [`SCOPE_KEY`].
    pub index_or_name: PathKey,
    /// Set when some path ends at this step.
    pub is_growing: bool,
    /// Node index of the growing object a path ends at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    /// Further steps.
    pub children: Vec<GrowingPathTree>,
}

/// Merges the visible paths of every growing object into one tree.
///
/// Paths sharing a prefix share tree entries. Every closure `context` edge
/// collapses into a single [`SCOPE_KEY`] entry per level.
pub fn growing_path_tree(
    graph: &HeapGraph,
    objects: &[GrowthObject],
) -> Result<Vec<GrowingPathTree>> {
    let mut tree = Vec::new();
    for object in objects {
        for path in &object.paths {
            let visible: Vec<Edge<'_>> = path
                .iter()
                .map(|&e| graph.edge(e))
                .filter(|&e| is_visible(e))
                .collect();
            add_path(&mut tree, &visible, object.node.0)?;
        }
    }
    Ok(tree)
}

fn add_path(mut level: &mut Vec<GrowingPathTree>, path: &[Edge<'_>], id: u32) -> Result<()> {
    for (depth, edge) in path.iter().enumerate() {
        let key = if edge.snapshot_type() == SnapshotEdgeType::Internal {
            PathKey::Name(SCOPE_KEY.to_owned())
        } else {
            PathKey::from(edge.index_or_name()?)
        };
        let pos = match level.iter().position(|c| c.index_or_name == key) {
            Some(pos) => pos,
            None => {
                level.push(GrowingPathTree {
                    edge_type: edge.edge_type()?,
                    index_or_name: key,
                    is_growing: false,
                    id: None,
                    children: Vec::new(),
                });
                level.len() - 1
            }
        };
        let entry = &mut level[pos];
        if depth + 1 == path.len() {
            entry.is_growing = true;
            entry.id = Some(id);
        }
        level = &mut entry.children;
    }
    Ok(())
}
