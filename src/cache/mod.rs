//! # Bucket File Cache
//!
//! Process-wide cache of in-memory bucket file state, bounded by a tiered
//! memory budget.
//!
//! ## Architecture
//!
//! ```text
//!   ┌─────────────────────────────────────────────────────────────────────────┐
//!   │                            BucketCache<L>                               │
//!   │                                                                         │
//!   │   loader: L            called without the lock on every miss            │
//!   │                                                                         │
//!   │   Mutex<CacheState>                                                     │
//!   │   ┌───────────────────────────────────────────────────────────────────┐ │
//!   │   │ index: EntryIndex      bucket → entry, plus recency order         │ │
//!   │   │ usage: MemoryUsage     sum of cached_size over all entries        │ │
//!   │   │ limit: MemoryUsage     per-tier budget; only the sum is enforced  │ │
//!   │   │ policies               body / header / metadata cursors           │ │
//!   │   └───────────────────────────────────────────────────────────────────┘ │
//!   └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Checkout Lifecycle
//!
//! ```text
//!   get(bucket)
//!     │
//!     ├─ hit:   take file out of entry, usage -= cached_size, touch
//!     │
//!     └─ miss:  unlock → loader.load() → lock → insert checked-out entry
//!     ▼
//!   BucketGuard  (owns the file, derefs to it)
//!     │
//!     ├─ release() / drop   verify, put file back, usage += file usage,
//!     │                     evict_while_full()
//!     ├─ erase()            drop entry and file
//!     └─ move_to(target)    re-key entry to target bucket
//! ```
//!
//! A checked-out entry counts nothing against the budget and holds no file,
//! so eviction can never strip or remove data an operation is using. Its
//! bytes are counted again when it returns.
//!
//! A file returned with unflushed changes stays cached and counted, but no
//! policy strips or removes it until [`BucketCache::flush_dirty_entries`]
//! or [`BucketCache::clear`] flushes it, or it is checked out again. Until
//! then the cache may stay above its limit.
//!
//! ## Concurrency
//!
//! One mutex guards all bookkeeping. Loading happens outside it, which is
//! only sound because callers serialise operations per bucket: a second
//! checkout of a bucket already in use panics, as does a load racing with
//! another load of the same bucket.
//!
//! ## Example
//!
//! ```ignore
//! let cache = BucketCacheBuilder::new()
//!     .body_limit(64 << 20)
//!     .header_limit(16 << 20)
//!     .metadata_limit(4 << 20)
//!     .build(loader);
//!
//! let mut file = cache.get(bucket, true)?;
//! file.put(doc);
//! file.flush_to_disk()?;
//! file.release()?;
//! ```

mod entry;
mod guard;
pub(crate) mod index;
mod stats;

pub use guard::BucketGuard;
pub use stats::{CacheDescription, CacheStatistics, EntryDescription};

use std::collections::BTreeMap;

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::bucket::{BucketId, BucketInfo};
use crate::error::{CacheError, CacheResult, InvariantError};
use crate::memory::{MemoryUsage, Tier};
use crate::policy::EvictionPolicies;
use crate::traits::{BucketFile, BucketLoader};

use index::EntryIndex;

#[cfg(feature = "metrics")]
use crate::metrics::metrics_impl::BucketCacheMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::BucketCacheMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::{
    BucketCacheMetricsRecorder, MetricsReset, MetricsSnapshotProvider,
};

struct CacheState<F> {
    index: EntryIndex<F>,
    usage: MemoryUsage,
    limit: MemoryUsage,
    policies: EvictionPolicies,
    #[cfg(feature = "metrics")]
    metrics: BucketCacheMetrics,
}

impl<F: BucketFile> CacheState<F> {
    fn evict_while_full(&mut self) {
        let report = self
            .policies
            .evict_while_full(&mut self.index, &mut self.usage, &self.limit);
        if report.is_empty() {
            return;
        }
        for pass in report.passes() {
            if pass.entries == 0 {
                continue;
            }
            debug!(
                tier = %pass.tier,
                entries = pass.entries,
                freed = pass.freed.sum(),
                "evicted to fit cache limit"
            );
            #[cfg(feature = "metrics")]
            self.metrics
                .record_eviction(pass.tier, pass.entries, pass.freed.sum());
        }
    }

    fn entries_in_use(&self) -> usize {
        self.index.iter_mru().filter(|entry| entry.in_use()).count()
    }

    fn entry_descriptions(&self) -> Vec<EntryDescription> {
        self.index
            .iter_mru()
            .enumerate()
            .map(|(rank, entry)| EntryDescription {
                bucket: entry.bucket(),
                last_used: entry.last_used(),
                rank,
                in_use: entry.in_use(),
                unflushed: entry.unflushed(),
                cached_size: entry.cached_size(),
            })
            .collect()
    }

    fn statistics(&self) -> CacheStatistics {
        CacheStatistics {
            memory_usage: self.usage,
            cache_limit: self.limit,
            entries: self.index.len(),
            entries_in_use: self.entries_in_use(),
        }
    }
}

/// Bounded cache of bucket files with tiered eviction.
///
/// See the [module documentation](self) for the checkout lifecycle.
pub struct BucketCache<L: BucketLoader> {
    loader: L,
    state: Mutex<CacheState<L::File>>,
}

impl<L: BucketLoader> BucketCache<L> {
    /// Creates a cache with the given budget. A zero limit disables caching:
    /// every returned file is dropped.
    pub fn new(loader: L, limit: MemoryUsage) -> Self {
        Self::with_capacity(loader, limit, 0)
    }

    pub(crate) fn with_capacity(loader: L, limit: MemoryUsage, expected_buckets: usize) -> Self {
        Self {
            loader,
            state: Mutex::new(CacheState {
                index: EntryIndex::with_capacity(expected_buckets),
                usage: MemoryUsage::ZERO,
                limit,
                policies: EvictionPolicies::new(),
                #[cfg(feature = "metrics")]
                metrics: BucketCacheMetrics::new(),
            }),
        }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Checks out the file for `bucket`, loading it on a miss.
    ///
    /// The returned guard owns the file until it is released, erased, moved
    /// or dropped. While checked out the entry cannot be evicted and counts
    /// nothing against the budget.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Load`] if the loader fails; nothing is cached.
    ///
    /// # Panics
    ///
    /// Panics if `bucket` is already checked out, or if another thread
    /// inserted `bucket` while this call was loading it.
    pub fn get(&self, bucket: BucketId, create_if_missing: bool) -> CacheResult<BucketGuard<'_, L>> {
        {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            if let Some((file, withdrawn)) = state.index.check_out(&bucket) {
                state.usage -= withdrawn;
                #[cfg(feature = "metrics")]
                state.metrics.record_hit();
                trace!(%bucket, "cache hit");
                return Ok(BucketGuard::new(self, bucket, file));
            }
        }

        debug!(%bucket, create_if_missing, "cache miss, loading bucket");
        let file = match self.loader.load(bucket, create_if_missing) {
            Ok(file) => file,
            Err(source) => {
                #[cfg(feature = "metrics")]
                self.state.lock().metrics.record_load_failure();
                warn!(%bucket, error = %source, "failed to load bucket");
                return Err(CacheError::Load { bucket, source });
            },
        };

        let mut state = self.state.lock();
        state.index.insert_checked_out(bucket);
        #[cfg(feature = "metrics")]
        state.metrics.record_miss();
        drop(state);
        Ok(BucketGuard::new(self, bucket, file))
    }

    /// Puts a checked-out file back. Called by the guard.
    ///
    /// The consistency check runs before the lock is taken. A file that
    /// fails it is still returned to the cache, pinned against eviction
    /// until it is flushed; the error is reported to the caller afterwards.
    pub(crate) fn return_to_cache(&self, bucket: BucketId, file: L::File) -> CacheResult<()> {
        let verified = file.verify_consistent();
        let usage = file.memory_usage();

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let discarded = if usage.sum() == 0 || state.limit.sum() == 0 {
            let entry = state.index.remove_checked_out(&bucket);
            #[cfg(feature = "metrics")]
            state.metrics.record_uncached_return();
            trace!(%bucket, "returned bucket not kept in cache");
            Some((file, entry))
        } else {
            state.index.check_in(&bucket, file, usage, verified.is_err());
            state.usage += usage;
            state.evict_while_full();
            None
        };
        if verified.is_err() {
            #[cfg(feature = "metrics")]
            state.metrics.record_inconsistent_return();
        }
        drop(guard);
        drop(discarded);

        verified.map_err(|source| {
            warn!(%bucket, error = %source, "bucket returned in inconsistent state");
            CacheError::Inconsistent { bucket, source }
        })
    }

    /// Drops a checked-out entry and its file. Called by the guard.
    pub(crate) fn erase_checked_out(&self, bucket: BucketId, file: L::File) {
        let mut state = self.state.lock();
        let entry = state.index.remove_checked_out(&bucket);
        #[cfg(feature = "metrics")]
        state.metrics.record_erase();
        drop(state);
        debug!(%bucket, "erased checked-out bucket");
        drop((file, entry));
    }

    /// Re-keys the checked-out entry `source` to `target`, discarding the
    /// checked-out placeholder at `target`. Returns the relocated file,
    /// which now belongs to `target`. Called by the guard.
    pub(crate) fn rename(
        &self,
        source: BucketId,
        mut file: L::File,
        target: BucketId,
        target_file: L::File,
    ) -> L::File {
        assert_ne!(source, target, "cannot move {} onto itself", source);
        assert!(
            target_file.is_empty(),
            "cannot move {} onto {}: target holds data",
            source,
            target
        );

        let mut state = self.state.lock();
        let Some(source_slot) = state.index.slot(&source) else {
            panic!("{} has no cache entry", source);
        };
        assert!(
            state.index.get(source_slot).is_some_and(|entry| entry.in_use()),
            "{} is not checked out",
            source
        );
        let replaced = state.index.remove_checked_out(&target);
        file.relocate(target);
        state.index.rekey(source_slot, target);
        #[cfg(feature = "metrics")]
        state.metrics.record_rename();
        drop(state);

        debug!(%source, %target, "moved bucket in cache");
        drop((target_file, replaced));
        file
    }

    /// Removes the idle entry for `bucket` without flushing it. Returns
    /// `false` if the bucket is not cached.
    ///
    /// # Panics
    ///
    /// Panics if the entry is checked out or has unflushed changes.
    pub fn erase(&self, bucket: BucketId) -> bool {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let Some(slot) = state.index.slot(&bucket) else {
            return false;
        };
        let Some(entry) = state.index.get_mut(slot) else {
            return false;
        };
        let Some(file) = entry.file_mut() else {
            panic!("cannot erase {} while it is checked out", bucket);
        };
        assert!(
            file.verify_consistent().is_ok(),
            "cannot erase {} with unflushed changes",
            bucket
        );
        let removed = state.index.remove(slot);
        if let Some(entry) = &removed {
            state.usage -= entry.cached_size();
        }
        #[cfg(feature = "metrics")]
        state.metrics.record_erase();
        drop(guard);

        debug!(%bucket, "erased bucket");
        drop(removed);
        true
    }

    /// Flushes and drops every idle entry.
    ///
    /// An entry whose flush fails stays cached; the remaining entries are
    /// still processed and the first failure is returned. Checked-out
    /// entries are left alone.
    pub fn clear(&self) -> CacheResult<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let mut first_error = None;
        let mut dropped = Vec::new();

        for slot in state.index.idle_slots() {
            let Some(entry) = state.index.get_mut(slot) else {
                continue;
            };
            let bucket = entry.bucket();
            if let Some(file) = entry.file_mut() {
                if let Err(source) = file.flush_to_disk() {
                    warn!(%bucket, error = %source, "flush failed, keeping bucket cached");
                    first_error.get_or_insert(CacheError::Flush { bucket, source });
                    continue;
                }
            }
            if let Some(entry) = state.index.remove(slot) {
                state.usage -= entry.cached_size();
                dropped.push(entry);
            }
        }
        #[cfg(feature = "metrics")]
        state.metrics.record_clear(dropped.len() as u64);
        let remaining = state.index.len();
        drop(guard);

        debug!(cleared = dropped.len(), remaining, "cleared cache");
        drop(dropped);
        first_error.map_or(Ok(()), Err)
    }

    /// Flushes every idle entry and reports the resulting bucket info.
    ///
    /// Entries stay cached, apart from formerly unflushed ones that the
    /// budget no longer has room for. On failure the remaining entries are
    /// still flushed and the first failure is returned.
    pub fn flush_dirty_entries(&self) -> CacheResult<BTreeMap<BucketId, BucketInfo>> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let mut first_error = None;
        let mut infos = BTreeMap::new();
        let mut unpinned = Vec::new();

        for slot in state.index.idle_slots() {
            let Some(entry) = state.index.get_mut(slot) else {
                continue;
            };
            let bucket = entry.bucket();
            let Some(file) = entry.file_mut() else {
                continue;
            };
            match file.flush_to_disk() {
                Ok(()) => {
                    infos.insert(bucket, file.bucket_info());
                    if entry.mark_flushed() {
                        unpinned.push(slot);
                    }
                },
                Err(source) => {
                    warn!(%bucket, error = %source, "failed to flush bucket");
                    first_error.get_or_insert(CacheError::Flush { bucket, source });
                },
            }
        }
        // Unpinned entries may sit below the cursors; move them above.
        for slot in &unpinned {
            state.index.touch(*slot);
        }
        if !unpinned.is_empty() {
            state.evict_while_full();
        }
        drop(guard);

        trace!(flushed = infos.len(), unpinned = unpinned.len(), "flushed dirty entries");
        match first_error {
            Some(err) => Err(err),
            None => Ok(infos),
        }
    }

    /// Replaces the budget and evicts until the new one is met.
    pub fn set_cache_limit(&self, limit: MemoryUsage) {
        let mut state = self.state.lock();
        info!(old = %state.limit, new = %limit, "changing cache limit");
        state.limit = limit;
        state.evict_while_full();
    }

    pub fn cache_limit(&self) -> MemoryUsage {
        self.state.lock().limit
    }

    /// Bytes currently counted against the budget, per tier.
    pub fn memory_usage(&self) -> MemoryUsage {
        self.state.lock().usage
    }

    /// Total bytes counted against the budget.
    pub fn size(&self) -> u64 {
        self.memory_usage().sum()
    }

    /// Returns `true` if `bucket` has an entry, checked out or not.
    pub fn contains(&self, bucket: BucketId) -> bool {
        self.state.lock().index.contains(&bucket)
    }

    pub fn len(&self) -> usize {
        self.state.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStatistics {
        self.state.lock().statistics()
    }

    /// Lists every entry from most to least recently used.
    pub fn describe_entries(&self) -> Vec<EntryDescription> {
        self.state.lock().entry_descriptions()
    }

    /// Totals and entry list taken under one lock.
    pub fn describe(&self) -> CacheDescription {
        let state = self.state.lock();
        CacheDescription {
            statistics: state.statistics(),
            entries: state.entry_descriptions(),
        }
    }

    /// Verifies the memory accounting and eviction cursors.
    ///
    /// Checks that:
    /// - the index views agree with each other
    /// - `memory_usage()` equals the sum of every entry's cached size
    /// - checked-out entries count nothing
    /// - no evictable entry at or below a policy's cursor still holds that
    ///   policy's tier, and none survives at or below the metadata cursor
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let state = self.state.lock();
        state.index.check_invariants()?;

        let body_cursor = state.policies.cursor(Tier::Body);
        let header_cursor = state.policies.cursor(Tier::Header);
        let metadata_cursor = state.policies.cursor(Tier::Metadata);

        let mut total = MemoryUsage::ZERO;
        for entry in state.index.iter_mru() {
            let size = entry.cached_size();
            total += size;
            if entry.in_use() {
                if !size.is_zero() {
                    return Err(InvariantError::new(format!(
                        "{} is checked out but still counts {}",
                        entry.bucket(),
                        size
                    )));
                }
                if entry.unflushed() {
                    return Err(InvariantError::new(format!(
                        "{} is checked out but still marked unflushed",
                        entry.bucket()
                    )));
                }
                continue;
            }
            // Pinned entries may sit below any cursor.
            if entry.unflushed() {
                continue;
            }
            let last_used = entry.last_used();
            if last_used <= metadata_cursor {
                return Err(InvariantError::new(format!(
                    "{} used at {} survived metadata eviction up to {}",
                    entry.bucket(),
                    last_used,
                    metadata_cursor
                )));
            }
            if last_used <= header_cursor && (size.header != 0 || size.body != 0) {
                return Err(InvariantError::new(format!(
                    "{} used at {} still holds headers past cursor {}",
                    entry.bucket(),
                    last_used,
                    header_cursor
                )));
            }
            if last_used <= body_cursor && size.body != 0 {
                return Err(InvariantError::new(format!(
                    "{} used at {} still holds bodies past cursor {}",
                    entry.bucket(),
                    last_used,
                    body_cursor
                )));
            }
        }
        if total != state.usage {
            return Err(InvariantError::new(format!(
                "entries hold {} but cache accounts {}",
                total, state.usage
            )));
        }
        Ok(())
    }
}

impl<L: BucketLoader> std::fmt::Debug for BucketCache<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("BucketCache")
            .field("entries", &stats.entries)
            .field("entries_in_use", &stats.entries_in_use)
            .field("memory_usage", &stats.memory_usage)
            .field("cache_limit", &stats.cache_limit)
            .finish()
    }
}

#[cfg(feature = "metrics")]
impl<L: BucketLoader> MetricsSnapshotProvider<BucketCacheMetricsSnapshot> for BucketCache<L> {
    fn snapshot(&self) -> BucketCacheMetricsSnapshot {
        let state = self.state.lock();
        let m = &state.metrics;
        BucketCacheMetricsSnapshot {
            get_calls: m.get_calls,
            hits: m.hits,
            misses: m.misses,
            load_failures: m.load_failures,
            body_evictions: m.body_evictions,
            header_evictions: m.header_evictions,
            metadata_evictions: m.metadata_evictions,
            body_bytes_evicted: m.body_bytes_evicted,
            header_bytes_evicted: m.header_bytes_evicted,
            metadata_bytes_evicted: m.metadata_bytes_evicted,
            uncached_returns: m.uncached_returns,
            inconsistent_returns: m.inconsistent_returns,
            erases: m.erases,
            renames: m.renames,
            clears: m.clears,
            cleared_entries: m.cleared_entries,
            entries: state.index.len(),
            entries_in_use: state.entries_in_use(),
            cached: state.usage,
            limit: state.limit,
        }
    }
}

#[cfg(feature = "metrics")]
impl<L: BucketLoader> MetricsReset for BucketCache<L> {
    fn reset_metrics(&self) {
        self.state.lock().metrics.reset();
    }
}
