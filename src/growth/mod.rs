//! Growth tracking across a sequence of heap snapshots.
//!
//! Each snapshot added to a [`HeapGrowthTracker`] is merged against the
//! previous one by walking both graphs in lockstep. Nodes whose property count
//! increased in every snapshot pair stay [`GrowthStatus::Growing`]; the
//! tracker then reports them as [`GrowthObject`]s with their access paths and
//! retained size estimates.

mod merge;
mod metrics;
mod options;
mod policy;
mod status;
mod tracker;

pub use merge::MergeStats;
pub use metrics::{default_metrics, CounterMetrics, NoopMetrics, TrackerMetrics};
pub use options::TrackerOptions;
pub use policy::{filter_include_dom, filter_no_dom, should_traverse};
pub use status::GrowthStatus;
pub use tracker::{GrowthAnalysis, GrowthObject, HeapGrowthTracker, LeakDiagnostics};
