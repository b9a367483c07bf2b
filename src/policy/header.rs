//! Header eviction: drops headers together with any remaining bodies,
//! leaving only the slot metadata cached.

use crate::cache::index::EntryIndex;
use crate::ds::slot_arena::SlotId;
use crate::memory::{MemoryUsage, Tier};
use crate::policy::EvictionPolicy;
use crate::traits::BucketFile;

#[derive(Debug, Default)]
pub(crate) struct HeaderEviction {
    cursor: u64,
}

impl EvictionPolicy for HeaderEviction {
    const TIER: Tier = Tier::Header;

    fn cursor(&self) -> u64 {
        self.cursor
    }

    fn advance_cursor(&mut self, last_used: u64) {
        debug_assert!(last_used > self.cursor, "header cursor moved backwards");
        self.cursor = last_used;
    }

    fn evict<F: BucketFile>(&mut self, index: &mut EntryIndex<F>, slot: SlotId) -> MemoryUsage {
        index
            .get_mut(slot)
            .map_or(MemoryUsage::ZERO, |entry| entry.strip(Tier::Header))
    }
}
