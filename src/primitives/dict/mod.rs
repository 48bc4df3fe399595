#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicU64, Ordering};

use lasso::{Key, Spur, ThreadedRodeo};
use tracing::trace;

use crate::types::StrId;

#[derive(Default)]
struct DictMetrics {
    intern_calls: AtomicU64,
    intern_hits: AtomicU64,
    intern_misses: AtomicU64,
}

/// Point-in-time copy of the interner's counters.
#[derive(Clone, Copy, Debug, Default)]
pub struct DictMetricsSnapshot {
    /// Total `intern` calls.
    pub intern_calls: u64,
    /// Calls that found an existing id.
    pub intern_hits: u64,
    /// Calls that allocated a new id.
    pub intern_misses: u64,
}

impl DictMetricsSnapshot {
    /// Fraction of intern calls served by an existing entry.
    pub fn intern_hit_rate(&self) -> f64 {
        if self.intern_calls == 0 {
            return 0.0;
        }
        self.intern_hits as f64 / self.intern_calls as f64
    }
}

impl DictMetrics {
    fn snapshot(&self) -> DictMetricsSnapshot {
        DictMetricsSnapshot {
            intern_calls: self.intern_calls.load(Ordering::Relaxed),
            intern_hits: self.intern_hits.load(Ordering::Relaxed),
            intern_misses: self.intern_misses.load(Ordering::Relaxed),
        }
    }

    fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Bidirectional string to [`StrId`] table.
///
/// Ids are dense and allocated in first-seen order. The map is append-only and
/// interior-mutable, so one instance can be shared (behind an `Arc`) between a
/// growth tracker and every graph it builds; equal strings always map to equal
/// ids regardless of which snapshot interned them.
pub struct StringMap {
    rodeo: ThreadedRodeo<Spur>,
    metrics: DictMetrics,
}

impl Default for StringMap {
    fn default() -> Self {
        Self::new()
    }
}

impl StringMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self {
            rodeo: ThreadedRodeo::new(),
            metrics: DictMetrics::default(),
        }
    }

    /// Returns the id for `s`, allocating one on first sight.
    pub fn intern(&self, s: &str) -> StrId {
        DictMetrics::inc(&self.metrics.intern_calls);
        if let Some(existing) = self.rodeo.get(s) {
            DictMetrics::inc(&self.metrics.intern_hits);
            return to_str_id(existing);
        }
        DictMetrics::inc(&self.metrics.intern_misses);
        let id = to_str_id(self.rodeo.get_or_intern(s));
        trace!(len = s.len(), id = id.0, "dict.intern.insert");
        id
    }

    /// Looks up the id of `s` without interning it.
    pub fn get(&self, s: &str) -> Option<StrId> {
        self.rodeo.get(s).map(to_str_id)
    }

    /// Resolves an id back to its string.
    ///
    /// Returns `None` for ids this map never handed out.
    pub fn resolve(&self, id: StrId) -> Option<&str> {
        let key = Spur::try_from_usize(id.0 as usize)?;
        self.rodeo.try_resolve(&key)
    }

    /// Number of distinct strings interned.
    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    /// Returns `true` when nothing has been interned.
    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }

    /// Copies the current counters.
    pub fn metrics(&self) -> DictMetricsSnapshot {
        self.metrics.snapshot()
    }
}

fn to_str_id(key: Spur) -> StrId {
    StrId(key.into_usize() as u32)
}
