//! Metadata eviction: the last resort. Removes the entry from the cache
//! entirely; the next checkout reloads it from disk.
//!
//! Only evictable entries reach this policy. An entry returned with
//! unflushed changes is pinned and passed over, so nothing dropped here
//! still needs a flush.

use tracing::trace;

use crate::cache::index::EntryIndex;
use crate::ds::slot_arena::SlotId;
use crate::memory::{MemoryUsage, Tier};
use crate::policy::EvictionPolicy;
use crate::traits::BucketFile;

#[derive(Debug, Default)]
pub(crate) struct MetadataEviction {
    cursor: u64,
}

impl EvictionPolicy for MetadataEviction {
    const TIER: Tier = Tier::Metadata;

    fn cursor(&self) -> u64 {
        self.cursor
    }

    fn advance_cursor(&mut self, last_used: u64) {
        debug_assert!(last_used > self.cursor, "metadata cursor moved backwards");
        self.cursor = last_used;
    }

    fn evict<F: BucketFile>(&mut self, index: &mut EntryIndex<F>, slot: SlotId) -> MemoryUsage {
        if !index.get(slot).is_some_and(|entry| entry.evictable()) {
            return MemoryUsage::ZERO;
        }
        match index.remove(slot) {
            Some(entry) => {
                trace!(bucket = %entry.bucket(), "evicted from cache");
                entry.cached_size()
            },
            None => MemoryUsage::ZERO,
        }
    }
}
