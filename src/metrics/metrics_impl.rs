use crate::memory::Tier;
use crate::metrics::traits::BucketCacheMetricsRecorder;

/// Counters for one bucket cache. Mutated only under the cache lock.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BucketCacheMetrics {
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
}

impl BucketCacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl BucketCacheMetricsRecorder for BucketCacheMetrics {
    fn record_hit(&mut self) {
        self.get_calls += 1;
        self.hits += 1;
    }

    fn record_miss(&mut self) {
        self.get_calls += 1;
        self.misses += 1;
    }

    fn record_load_failure(&mut self) {
        self.get_calls += 1;
        self.load_failures += 1;
    }

    fn record_eviction(&mut self, tier: Tier, entries: u64, freed_bytes: u64) {
        let (count, bytes) = match tier {
            Tier::Body => (&mut self.body_evictions, &mut self.body_bytes_evicted),
            Tier::Header => (&mut self.header_evictions, &mut self.header_bytes_evicted),
            Tier::Metadata => (&mut self.metadata_evictions, &mut self.metadata_bytes_evicted),
        };
        *count += entries;
        *bytes += freed_bytes;
    }

    fn record_uncached_return(&mut self) {
        self.uncached_returns += 1;
    }

    fn record_inconsistent_return(&mut self) {
        self.inconsistent_returns += 1;
    }

    fn record_erase(&mut self) {
        self.erases += 1;
    }

    fn record_rename(&mut self) {
        self.renames += 1;
    }

    fn record_clear(&mut self, entries: u64) {
        self.clears += 1;
        self.cleared_entries += entries;
    }
}
