//! A single cached bucket.
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────┐
//!   │                       Entry<F>                           │
//!   ├──────────────────────┬───────────────────────────────────┤
//!   │  bucket: BucketId    │  index key, changes only on move  │
//!   │  file: Option<F>     │  None while checked out           │
//!   │  cached_size         │  bytes counted against the budget │
//!   │  last_used: u64      │  recency index key                │
//!   │  unflushed: bool     │  returned with unflushed changes  │
//!   └──────────────────────┴───────────────────────────────────┘
//! ```
//!
//! The in-use flag is the absence of the file: a checked-out file lives in
//! its guard, so eviction has nothing to strip from an in-use entry.
//!
//! An idle entry marked unflushed is pinned: eviction passes over it until
//! a flush succeeds or the next checkout clears the mark.

use crate::bucket::BucketId;
use crate::memory::{MemoryUsage, Tier};
use crate::traits::BucketFile;

#[derive(Debug)]
pub(crate) struct Entry<F> {
    bucket: BucketId,
    file: Option<F>,
    cached_size: MemoryUsage,
    last_used: u64,
    unflushed: bool,
}

impl<F> Entry<F> {
    /// Creates an entry that is already checked out, with nothing counted
    /// against the budget.
    pub(crate) fn checked_out(bucket: BucketId, last_used: u64) -> Self {
        Self {
            bucket,
            file: None,
            cached_size: MemoryUsage::ZERO,
            last_used,
            unflushed: false,
        }
    }

    #[inline]
    pub(crate) fn bucket(&self) -> BucketId {
        self.bucket
    }

    #[inline]
    pub(crate) fn set_bucket(&mut self, bucket: BucketId) {
        self.bucket = bucket;
    }

    #[inline]
    pub(crate) fn in_use(&self) -> bool {
        self.file.is_none()
    }

    #[inline]
    pub(crate) fn unflushed(&self) -> bool {
        self.unflushed
    }

    /// Idle and safe to strip or drop.
    #[inline]
    pub(crate) fn evictable(&self) -> bool {
        !self.in_use() && !self.unflushed
    }

    /// Pins an idle entry whose file failed its consistency check.
    pub(crate) fn mark_unflushed(&mut self) {
        debug_assert!(!self.in_use(), "{} marked while checked out", self.bucket);
        self.unflushed = true;
    }

    /// Clears the unflushed mark after a successful flush. Returns whether
    /// the entry was marked.
    pub(crate) fn mark_flushed(&mut self) -> bool {
        std::mem::replace(&mut self.unflushed, false)
    }

    #[inline]
    pub(crate) fn cached_size(&self) -> MemoryUsage {
        self.cached_size
    }

    #[inline]
    pub(crate) fn last_used(&self) -> u64 {
        self.last_used
    }

    #[inline]
    pub(crate) fn set_last_used(&mut self, last_used: u64) {
        self.last_used = last_used;
    }

    pub(crate) fn file_mut(&mut self) -> Option<&mut F> {
        self.file.as_mut()
    }

    /// Takes the file out for a checkout and withdraws its bytes from the
    /// budget. Returns the withdrawn usage.
    ///
    /// # Panics
    ///
    /// Panics if the entry is already checked out.
    pub(crate) fn check_out(&mut self) -> (F, MemoryUsage) {
        let Some(file) = self.file.take() else {
            panic!(
                "{} checked out twice; at most one operation may use a bucket at a time",
                self.bucket
            );
        };
        let withdrawn = std::mem::replace(&mut self.cached_size, MemoryUsage::ZERO);
        self.unflushed = false;
        (file, withdrawn)
    }

    /// Puts a returned file back and records what it now costs.
    pub(crate) fn check_in(&mut self, file: F, usage: MemoryUsage) {
        assert!(self.in_use(), "{} returned while not checked out", self.bucket);
        self.file = Some(file);
        self.cached_size = usage;
    }
}

impl<F: BucketFile> Entry<F> {
    /// Strips `tier` (and everything evicted before it) from the cached
    /// file. Returns the bytes no longer counted against the budget.
    ///
    /// In-use and unflushed entries are left alone and return zero.
    pub(crate) fn strip(&mut self, tier: Tier) -> MemoryUsage {
        debug_assert_ne!(tier, Tier::Metadata, "metadata eviction removes the entry");
        if self.unflushed {
            return MemoryUsage::ZERO;
        }
        let Some(file) = self.file.as_mut() else {
            return MemoryUsage::ZERO;
        };
        file.evict(tier);
        let remaining = self.cached_size.without(tier);
        let freed = self.cached_size - remaining;
        self.cached_size = remaining;
        freed
    }
}
