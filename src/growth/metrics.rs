use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Trait for observing growth tracker activity.
///
/// Implementations receive one callback per tracker milestone and can be
/// used for monitoring long tracking sessions.
pub trait TrackerMetrics: Send + Sync {
    /// Records a snapshot accepted into the tracker.
    fn snapshot_added(&self, nodes: usize, edges: usize);

    /// Records a snapshot rejected during construction.
    fn snapshot_rejected(&self);

    /// Records a completed merge against the previous snapshot.
    ///
    /// # Parameters
    /// * `pairs_visited` - Node pairs matched between the two graphs.
    /// * `growing` - Nodes promoted to growing.
    fn merge_completed(&self, pairs_visited: usize, growing: usize);

    /// Records a computed growth report with `objects` growing objects.
    fn growth_report(&self, objects: usize);
}

/// A no-op implementation of [`TrackerMetrics`].
#[derive(Default)]
pub struct NoopMetrics;

impl TrackerMetrics for NoopMetrics {
    fn snapshot_added(&self, _nodes: usize, _edges: usize) {}
    fn snapshot_rejected(&self) {}
    fn merge_completed(&self, _pairs_visited: usize, _growing: usize) {}
    fn growth_report(&self, _objects: usize) {}
}

/// A thread-safe counter-based implementation of [`TrackerMetrics`].
#[derive(Default)]
pub struct CounterMetrics {
    /// Snapshots accepted.
    pub snapshots_added: AtomicU64,

    /// Snapshots rejected as malformed or failed.
    pub snapshots_rejected: AtomicU64,

    /// Nodes across all accepted snapshots.
    pub nodes_ingested: AtomicU64,

    /// Edges across all accepted snapshots.
    pub edges_ingested: AtomicU64,

    /// Merges run.
    pub merges: AtomicU64,

    /// Node pairs matched across all merges.
    pub merge_pairs_visited: AtomicU64,

    /// Growing nodes found by the most recent merge.
    pub last_growing: AtomicU64,

    /// Growth reports computed.
    pub reports: AtomicU64,

    /// Growing objects across all reports.
    pub growth_objects: AtomicU64,
}

impl TrackerMetrics for CounterMetrics {
    fn snapshot_added(&self, nodes: usize, edges: usize) {
        self.snapshots_added.fetch_add(1, Ordering::Relaxed);
        self.nodes_ingested.fetch_add(nodes as u64, Ordering::Relaxed);
        self.edges_ingested.fetch_add(edges as u64, Ordering::Relaxed);
    }

    fn snapshot_rejected(&self) {
        self.snapshots_rejected.fetch_add(1, Ordering::Relaxed);
    }

    fn merge_completed(&self, pairs_visited: usize, growing: usize) {
        self.merges.fetch_add(1, Ordering::Relaxed);
        self.merge_pairs_visited
            .fetch_add(pairs_visited as u64, Ordering::Relaxed);
        self.last_growing.store(growing as u64, Ordering::Relaxed);
    }

    fn growth_report(&self, objects: usize) {
        self.reports.fetch_add(1, Ordering::Relaxed);
        self.growth_objects
            .fetch_add(objects as u64, Ordering::Relaxed);
    }
}

/// Returns the default metrics implementation, [`NoopMetrics`].
pub fn default_metrics() -> Arc<dyn TrackerMetrics> {
    Arc::new(NoopMetrics)
}
