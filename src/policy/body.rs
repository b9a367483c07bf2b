//! Body eviction: the first and cheapest tier to give up.
//!
//! Body blobs are the bulk of a bucket's cached bytes and are only needed
//! when a document is actually returned to a client, so they are stripped
//! long before header or metadata. The entry stays cached.

use crate::cache::index::EntryIndex;
use crate::ds::slot_arena::SlotId;
use crate::memory::{MemoryUsage, Tier};
use crate::policy::EvictionPolicy;
use crate::traits::BucketFile;

#[derive(Debug, Default)]
pub(crate) struct BodyEviction {
    cursor: u64,
}

impl EvictionPolicy for BodyEviction {
    const TIER: Tier = Tier::Body;

    fn cursor(&self) -> u64 {
        self.cursor
    }

    fn advance_cursor(&mut self, last_used: u64) {
        debug_assert!(last_used > self.cursor, "body cursor moved backwards");
        self.cursor = last_used;
    }

    fn evict<F: BucketFile>(&mut self, index: &mut EntryIndex<F>, slot: SlotId) -> MemoryUsage {
        index
            .get_mut(slot)
            .map_or(MemoryUsage::ZERO, |entry| entry.strip(Tier::Body))
    }
}
