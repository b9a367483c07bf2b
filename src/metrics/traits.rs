//! # Metrics Traits
//!
//! Recorders only write counters; providers only read/snapshot; exporters
//! only publish. Cache code depends on the recorder alone.

use crate::memory::Tier;

/// Counters written by the cache while it holds its state lock.
pub trait BucketCacheMetricsRecorder {
    /// A checkout found the bucket already cached.
    fn record_hit(&mut self);
    /// A checkout had to load the bucket.
    fn record_miss(&mut self);
    /// A load on a miss failed; nothing was cached.
    fn record_load_failure(&mut self);
    /// An eviction pass freed `tier` from `entries` entries.
    fn record_eviction(&mut self, tier: Tier, entries: u64, freed_bytes: u64);
    /// A returned entry was dropped because it held nothing worth caching
    /// or the cache is disabled.
    fn record_uncached_return(&mut self);
    /// A returned file failed its consistency check.
    fn record_inconsistent_return(&mut self);
    fn record_erase(&mut self);
    fn record_rename(&mut self);
    /// `clear()` dropped `entries` idle entries.
    fn record_clear(&mut self, entries: u64);
}

/// Snapshot provider for tests and monitoring.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Reset counters between tests or benchmark iterations.
pub trait MetricsReset {
    fn reset_metrics(&self);
}

/// Export/publish metrics to production monitoring backends.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}
