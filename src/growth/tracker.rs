use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Result;
use crate::heap::traversal::bfs_visitor;
use crate::heap::{Edge, HeapGraph, Node, SnapshotSource};
use crate::primitives::bits::{OneBitArray, TwoBitArray};
use crate::primitives::dict::StringMap;
use crate::types::{EdgeIndex, NodeIndex};

use super::merge::merge_graphs;
use super::metrics::{default_metrics, TrackerMetrics};
use super::options::TrackerOptions;
use super::policy::{filter_include_dom, filter_no_dom};
use super::status::GrowthStatus;

/// A node that grew across every snapshot pair, with the paths that reach it
/// and its size attribution.
#[derive(Clone, Debug, PartialEq)]
pub struct GrowthObject {
    /// The growing node in the current graph.
    pub node: NodeIndex,
    /// Distinct root-to-node edge paths, each ending in an edge into `node`.
    pub paths: Vec<Vec<EdgeIndex>>,
    /// Self sizes of descendants reachable only through this leak.
    pub retained_size: u64,
    /// Self sizes of leak-only descendants, split evenly among the leaks sharing them.
    pub adjusted_retained_size: f64,
    /// Self sizes of every descendant, shared or not. An upper bound.
    pub transitive_closure_size: u64,
}

impl GrowthObject {
    /// View of the growing node.
    pub fn node<'g>(&self, graph: &'g HeapGraph) -> Node<'g> {
        graph.node(self.node)
    }

    /// Edge views for path `i`.
    pub fn path_edges<'g>(&self, graph: &'g HeapGraph, i: usize) -> Vec<Edge<'g>> {
        self.paths
            .get(i)
            .map(|p| p.iter().map(|&e| graph.edge(e)).collect())
            .unwrap_or_default()
    }
}

/// Intermediate reachability state from the last growth analysis.
#[derive(Clone, Debug)]
pub struct LeakDiagnostics {
    /// Per node: how many growing objects reach it without crossing non-leak memory.
    pub leak_refs: Vec<u32>,
    /// Nodes reachable from the user roots without entering a growing object.
    pub non_leak_visits: OneBitArray,
}

/// Growth objects plus the diagnostics used to size them.
#[derive(Clone, Debug)]
pub struct GrowthAnalysis {
    /// One entry per growing node, ordered by node index.
    pub objects: Vec<GrowthObject>,
    /// Reference counters and non-leak visit bits.
    pub diagnostics: LeakDiagnostics,
}

struct Generation {
    graph: HeapGraph,
    status: TwoBitArray<GrowthStatus>,
}

/// Tracks per-node growth across a sequence of heap snapshots.
///
/// Only the most recent graph and its status array are retained. The string
/// map outlives every generation so names compare by id across snapshots.
pub struct HeapGrowthTracker {
    strings: Arc<StringMap>,
    current: Option<Generation>,
    snapshots: usize,
    options: TrackerOptions,
    metrics: Arc<dyn TrackerMetrics>,
}

impl Default for HeapGrowthTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl HeapGrowthTracker {
    /// Creates a tracker with default options.
    pub fn new() -> Self {
        Self::with_options(TrackerOptions::default())
    }

    /// Creates a tracker with the given options.
    pub fn with_options(options: TrackerOptions) -> Self {
        let metrics = options.metrics.clone().unwrap_or_else(default_metrics);
        Self {
            strings: Arc::new(StringMap::new()),
            current: None,
            snapshots: 0,
            options,
            metrics,
        }
    }

    /// Builds a graph from `source` and merges it against the previous one.
    ///
    /// The tracker is left untouched if the snapshot cannot be built. Callers
    /// must not start another `add_snapshot` before this one resolves.
    pub async fn add_snapshot<S>(&mut self, source: &mut S) -> Result<()>
    where
        S: SnapshotSource + ?Sized,
    {
        let graph = match HeapGraph::build(source, Arc::clone(&self.strings)).await {
            Ok(graph) => graph,
            Err(err) => {
                warn!(
                    error = %err,
                    snapshots = self.snapshots,
                    "tracker.add_snapshot.rejected"
                );
                self.metrics.snapshot_rejected();
                return Err(err);
            }
        };
        self.metrics
            .snapshot_added(graph.node_count(), graph.edge_count());

        let mut status = TwoBitArray::new(graph.node_count());
        if let Some(previous) = &self.current {
            // Only paths present since the first snapshot are candidates.
            status.fill(GrowthStatus::NotGrowing);
            let stats = merge_graphs(&previous.graph, &previous.status, &graph, &mut status);
            debug!(
                pairs = stats.pairs_visited,
                growing = stats.growing,
                nodes = graph.node_count(),
                "tracker.merge.done"
            );
            self.metrics
                .merge_completed(stats.pairs_visited, stats.growing);
        }
        self.current = Some(Generation { graph, status });
        self.snapshots += 1;
        debug!(snapshots = self.snapshots, "tracker.add_snapshot.done");
        Ok(())
    }

    /// Number of snapshots accepted so far.
    pub fn snapshot_count(&self) -> usize {
        self.snapshots
    }

    /// The most recent graph, if any snapshot has been added.
    pub fn graph(&self) -> Option<&HeapGraph> {
        self.current.as_ref().map(|g| &g.graph)
    }

    /// The string map shared by every graph this tracker builds.
    pub fn strings(&self) -> &Arc<StringMap> {
        &self.strings
    }

    /// Growth status of `node` in the most recent graph.
    pub fn growth_status(&self, node: NodeIndex) -> Option<GrowthStatus> {
        let current = self.current.as_ref()?;
        (node.as_usize() < current.graph.node_count())
            .then(|| current.status.get(node.as_usize()))
    }

    /// Returns `true` if `node` is classified as growing.
    pub fn is_growing(&self, node: NodeIndex) -> bool {
        self.growth_status(node) == Some(GrowthStatus::Growing)
    }

    /// Computes growth objects for the most recent graph.
    pub fn growing_paths(&self) -> Vec<GrowthObject> {
        self.analyze().map(|a| a.objects).unwrap_or_default()
    }

    /// Computes growth objects together with the reachability diagnostics.
    ///
    /// Returns `None` until a snapshot has been added.
    pub fn analyze(&self) -> Option<GrowthAnalysis> {
        let Generation { graph, status } = self.current.as_ref()?;
        let node_count = graph.node_count();

        // Growing paths, ignoring the DOM.
        let mut growth_paths: BTreeMap<NodeIndex, Vec<Vec<EdgeIndex>>> = BTreeMap::new();
        graph.visit_global_edges(
            |edge, path| {
                let to = edge.to_index();
                if status.get(to.as_usize()) == GrowthStatus::Growing {
                    growth_paths.entry(to).or_default().push(path.edges());
                }
            },
            filter_no_dom,
        );
        let mut targets = OneBitArray::new(node_count);
        for target in growth_paths.keys() {
            targets.set(target.as_usize(), true);
        }

        // Everything reachable from the user roots without passing through a leak.
        let mut non_leak_visits = OneBitArray::new(node_count);
        graph.visit_user_roots(
            |n| non_leak_visits.set(n.index().as_usize(), true),
            |n, e| filter_include_dom(n, e) && !targets.get(e.to_index().as_usize()),
        );
        let leak_only = |n: Node<'_>, e: Edge<'_>| {
            filter_include_dom(n, e) && !non_leak_visits.get(e.to_index().as_usize())
        };

        let mut leak_refs = vec![0u32; node_count];
        for &target in growth_paths.keys() {
            bfs_visitor(
                graph,
                &[target],
                |n| {
                    let slot = &mut leak_refs[n.index().as_usize()];
                    *slot = slot.saturating_add(1);
                },
                leak_only,
            );
        }

        let mut objects = Vec::with_capacity(growth_paths.len());
        for (target, paths) in growth_paths {
            let mut retained_size = 0u64;
            let mut adjusted_retained_size = 0f64;
            bfs_visitor(
                graph,
                &[target],
                |n| {
                    let refs = leak_refs[n.index().as_usize()].max(1);
                    let size = u64::from(n.self_size());
                    if refs == 1 {
                        retained_size += size;
                    }
                    adjusted_retained_size += size as f64 / f64::from(refs);
                },
                leak_only,
            );

            let mut transitive_closure_size = 0u64;
            if self.options.compute_transitive_closure {
                bfs_visitor(
                    graph,
                    &[target],
                    |n| transitive_closure_size += u64::from(n.self_size()),
                    filter_include_dom,
                );
            }

            objects.push(GrowthObject {
                node: target,
                paths,
                retained_size,
                adjusted_retained_size,
                transitive_closure_size,
            });
        }
        debug!(objects = objects.len(), "tracker.growth.report");
        self.metrics.growth_report(objects.len());

        Some(GrowthAnalysis {
            objects,
            diagnostics: LeakDiagnostics {
                leak_refs,
                non_leak_visits,
            },
        })
    }
}
