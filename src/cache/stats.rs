//! Read-only views of the cache for status pages and debugging.

use std::fmt;

use crate::bucket::BucketId;
use crate::memory::MemoryUsage;

/// Point-in-time totals for one cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStatistics {
    pub memory_usage: MemoryUsage,
    pub cache_limit: MemoryUsage,
    pub entries: usize,
    pub entries_in_use: usize,
}

impl fmt::Display for CacheStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries ({} in use), using {} of {}",
            self.entries, self.entries_in_use, self.memory_usage, self.cache_limit
        )
    }
}

/// One cache entry as seen by [`BucketCache::describe_entries`].
///
/// [`BucketCache::describe_entries`]: crate::cache::BucketCache::describe_entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryDescription {
    pub bucket: BucketId,
    pub last_used: u64,
    /// Position in recency order; `0` is the most recently used entry.
    pub rank: usize,
    pub in_use: bool,
    /// Returned with unflushed changes; eviction passes over it.
    pub unflushed: bool,
    pub cached_size: MemoryUsage,
}

impl fmt::Display for EntryDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} last_used={} size={}",
            self.rank, self.bucket, self.last_used, self.cached_size
        )?;
        if self.in_use {
            f.write_str(" (in use)")?;
        }
        if self.unflushed {
            f.write_str(" (unflushed)")?;
        }
        Ok(())
    }
}

/// Full dump of a cache: totals followed by every entry, MRU first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDescription {
    pub statistics: CacheStatistics,
    pub entries: Vec<EntryDescription>,
}

impl fmt::Display for CacheDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BucketCache: {}", self.statistics)?;
        for entry in &self.entries {
            writeln!(f, "  {}", entry)?;
        }
        Ok(())
    }
}
