use std::fmt;
use std::sync::Arc;

use super::metrics::TrackerMetrics;

/// Configuration supplied when creating a [`super::HeapGrowthTracker`].
#[derive(Clone)]
pub struct TrackerOptions {
    /// Whether to compute the transitive closure size of each growing object.
    ///
    /// The figure is an upper bound that ignores sharing; when disabled it is
    /// reported as zero.
    pub compute_transitive_closure: bool,
    /// Optional metrics sink.
    pub metrics: Option<Arc<dyn TrackerMetrics>>,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            compute_transitive_closure: true,
            metrics: None,
        }
    }
}

impl fmt::Debug for TrackerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerOptions")
            .field("compute_transitive_closure", &self.compute_transitive_closure)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl TrackerOptions {
    /// Creates options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the transitive closure size metric.
    pub fn compute_transitive_closure(mut self, enabled: bool) -> Self {
        self.compute_transitive_closure = enabled;
        self
    }

    /// Sets the metrics collection implementation.
    pub fn metrics(mut self, metrics: Arc<dyn TrackerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}
