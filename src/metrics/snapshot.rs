use crate::memory::MemoryUsage;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BucketCacheMetricsSnapshot {
    /// Every `get` call, including ones whose load failed.
    pub get_calls: u64,
    pub hits: u64,
    pub misses: u64,
    pub load_failures: u64,

    pub body_evictions: u64,
    pub header_evictions: u64,
    pub metadata_evictions: u64,
    pub body_bytes_evicted: u64,
    pub header_bytes_evicted: u64,
    pub metadata_bytes_evicted: u64,

    pub uncached_returns: u64,
    pub inconsistent_returns: u64,
    pub erases: u64,
    pub renames: u64,
    pub clears: u64,
    pub cleared_entries: u64,

    // gauges captured at snapshot time
    pub entries: usize,
    pub entries_in_use: usize,
    pub cached: MemoryUsage,
    pub limit: MemoryUsage,
}

impl BucketCacheMetricsSnapshot {
    /// Fraction of checkouts served from the cache, `0.0` before any.
    pub fn hit_ratio(&self) -> f64 {
        if self.get_calls == 0 {
            0.0
        } else {
            self.hits as f64 / self.get_calls as f64
        }
    }
}
