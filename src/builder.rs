//! Builder for [`BucketCache`].
//!
//! Collects the per-tier budget and sizing hints, then hands the loader to
//! the cache.
//!
//! ## Example
//!
//! ```rust
//! use bucketcache::builder::BucketCacheBuilder;
//! use bucketcache::memory::MemoryUsage;
//! # use bucketcache::bucket::{BucketId, BucketInfo};
//! # use bucketcache::memory::Tier;
//! # use bucketcache::traits::{BucketFile, BucketLoader, FileError};
//! # struct NullFile;
//! # impl BucketFile for NullFile {
//! #     fn memory_usage(&self) -> MemoryUsage { MemoryUsage::ZERO }
//! #     fn evict(&mut self, _tier: Tier) {}
//! #     fn flush_to_disk(&mut self) -> Result<(), FileError> { Ok(()) }
//! #     fn verify_consistent(&self) -> Result<(), FileError> { Ok(()) }
//! #     fn bucket_info(&self) -> BucketInfo { BucketInfo::default() }
//! #     fn is_empty(&self) -> bool { true }
//! #     fn relocate(&mut self, _bucket: BucketId) {}
//! # }
//! # struct NullLoader;
//! # impl BucketLoader for NullLoader {
//! #     type File = NullFile;
//! #     fn load(&self, _: BucketId, _: bool) -> Result<NullFile, FileError> { Ok(NullFile) }
//! # }
//!
//! let cache = BucketCacheBuilder::new()
//!     .metadata_limit(1 << 20)
//!     .header_limit(4 << 20)
//!     .body_limit(16 << 20)
//!     .expected_buckets(1024)
//!     .build(NullLoader);
//!
//! assert_eq!(cache.cache_limit(), MemoryUsage::new(1 << 20, 4 << 20, 16 << 20));
//! assert!(cache.is_empty());
//! ```

use crate::cache::BucketCache;
use crate::memory::MemoryUsage;
use crate::traits::BucketLoader;

/// Configures and builds a [`BucketCache`].
///
/// Every limit defaults to zero, which disables caching until a budget is
/// set with [`BucketCache::set_cache_limit`].
#[derive(Debug, Clone, Default)]
pub struct BucketCacheBuilder {
    limit: MemoryUsage,
    expected_buckets: usize,
}

impl BucketCacheBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets all three tier limits at once.
    pub fn limit(mut self, limit: MemoryUsage) -> Self {
        self.limit = limit;
        self
    }

    pub fn metadata_limit(mut self, bytes: u64) -> Self {
        self.limit.metadata = bytes;
        self
    }

    pub fn header_limit(mut self, bytes: u64) -> Self {
        self.limit.header = bytes;
        self
    }

    pub fn body_limit(mut self, bytes: u64) -> Self {
        self.limit.body = bytes;
        self
    }

    /// Pre-sizes the entry index for roughly this many cached buckets.
    pub fn expected_buckets(mut self, buckets: usize) -> Self {
        self.expected_buckets = buckets;
        self
    }

    pub fn build<L: BucketLoader>(self, loader: L) -> BucketCache<L> {
        BucketCache::with_capacity(loader, self.limit, self.expected_buckets)
    }
}
