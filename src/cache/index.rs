//! Two views over one entry set.
//!
//! ```text
//!   by_bucket: FxHashMap<BucketId, SlotId>        by_recency: BTreeMap<u64, SlotId>
//!   ┌──────────┬────────┐                         ┌───────────┬────────┐
//!   │ bucket_a │ id_0 ──┼──┐                   ┌──┼── id_1    │   3    │  (LRU)
//!   │ bucket_b │ id_1 ──┼──┼──┐             ┌──┼──┼── id_0    │   7    │
//!   │ bucket_c │ id_2 ──┼──┼──┼──┐       ┌──┼──┼──┼── id_2    │   9    │  (MRU)
//!   └──────────┴────────┘  │  │  │       │  │  │  └───────────┴────────┘
//!                          ▼  ▼  ▼       │  │  │
//!   entries: SlotArena<Entry<F>> ◄───────┴──┴──┘
//! ```
//!
//! An entry is in `by_bucket` iff it is in `by_recency`, and each entry's
//! `last_used` is its `by_recency` key. `last_used` values come from one
//! counter that only grows, so keys never collide.

use std::collections::BTreeMap;
use std::ops::Bound;

use rustc_hash::FxHashMap;

use crate::bucket::BucketId;
use crate::cache::entry::Entry;
use crate::ds::slot_arena::{SlotArena, SlotId};
use crate::error::InvariantError;
use crate::memory::MemoryUsage;

#[derive(Debug)]
pub(crate) struct EntryIndex<F> {
    entries: SlotArena<Entry<F>>,
    by_bucket: FxHashMap<BucketId, SlotId>,
    by_recency: BTreeMap<u64, SlotId>,
    use_counter: u64,
}

impl<F> EntryIndex<F> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: SlotArena::with_capacity(capacity),
            by_bucket: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            by_recency: BTreeMap::new(),
            use_counter: 0,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.by_bucket.len()
    }

    #[inline]
    pub(crate) fn slot(&self, bucket: &BucketId) -> Option<SlotId> {
        self.by_bucket.get(bucket).copied()
    }

    #[inline]
    pub(crate) fn contains(&self, bucket: &BucketId) -> bool {
        self.by_bucket.contains_key(bucket)
    }

    #[inline]
    pub(crate) fn get(&self, slot: SlotId) -> Option<&Entry<F>> {
        self.entries.get(slot)
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, slot: SlotId) -> Option<&mut Entry<F>> {
        self.entries.get_mut(slot)
    }

    fn next_use(&mut self) -> u64 {
        self.use_counter += 1;
        self.use_counter
    }

    /// Inserts a checked-out entry for `bucket` at the MRU end.
    ///
    /// # Panics
    ///
    /// Panics if `bucket` is already present: two concurrent loads of the
    /// same bucket mean the single-writer discipline was broken.
    pub(crate) fn insert_checked_out(&mut self, bucket: BucketId) -> SlotId {
        assert!(
            !self.by_bucket.contains_key(&bucket),
            "{} was inserted by another thread while it was being loaded",
            bucket
        );
        let last_used = self.next_use();
        let slot = self.entries.insert(Entry::checked_out(bucket, last_used));
        self.by_bucket.insert(bucket, slot);
        self.by_recency.insert(last_used, slot);
        slot
    }

    /// Moves `slot` to the MRU end and returns its new `last_used`.
    pub(crate) fn touch(&mut self, slot: SlotId) -> u64 {
        let last_used = self.next_use();
        if let Some(entry) = self.entries.get_mut(slot) {
            self.by_recency.remove(&entry.last_used());
            entry.set_last_used(last_used);
            self.by_recency.insert(last_used, slot);
        }
        last_used
    }

    /// Checks out the cached entry for `bucket`, moving it to the MRU end.
    /// Returns the file and the usage withdrawn from the budget, or `None`
    /// if the bucket is not cached.
    ///
    /// # Panics
    ///
    /// Panics if the entry is already checked out.
    pub(crate) fn check_out(&mut self, bucket: &BucketId) -> Option<(F, MemoryUsage)> {
        let slot = self.slot(bucket)?;
        let checked_out = self.entries.get_mut(slot)?.check_out();
        self.touch(slot);
        Some(checked_out)
    }

    /// Returns a checked-out file to its entry at the MRU end, counting
    /// `usage` for it. An `unflushed` file is pinned against eviction.
    ///
    /// # Panics
    ///
    /// Panics if `bucket` is not cached or not checked out.
    pub(crate) fn check_in(
        &mut self,
        bucket: &BucketId,
        file: F,
        usage: MemoryUsage,
        unflushed: bool,
    ) {
        let Some(slot) = self.slot(bucket) else {
            panic!("{} returned to the cache but has no entry", bucket);
        };
        if let Some(entry) = self.entries.get_mut(slot) {
            entry.check_in(file, usage);
            if unflushed {
                entry.mark_unflushed();
            }
        }
        self.touch(slot);
    }

    /// Removes the entry for `bucket`, which must be checked out.
    ///
    /// # Panics
    ///
    /// Panics if `bucket` is not cached or is idle.
    pub(crate) fn remove_checked_out(&mut self, bucket: &BucketId) -> Option<Entry<F>> {
        let Some(slot) = self.slot(bucket) else {
            panic!("{} has no cache entry", bucket);
        };
        assert!(
            self.entries.get(slot).is_some_and(|entry| entry.in_use()),
            "{} is not checked out",
            bucket
        );
        self.remove(slot)
    }

    /// Removes `slot` from both views and the arena.
    pub(crate) fn remove(&mut self, slot: SlotId) -> Option<Entry<F>> {
        let entry = self.entries.remove(slot)?;
        self.by_bucket.remove(&entry.bucket());
        self.by_recency.remove(&entry.last_used());
        Some(entry)
    }

    /// Re-keys the entry in `slot` to `bucket`, keeping its recency.
    pub(crate) fn rekey(&mut self, slot: SlotId, bucket: BucketId) {
        let Some(entry) = self.entries.get_mut(slot) else {
            return;
        };
        self.by_bucket.remove(&entry.bucket());
        entry.set_bucket(bucket);
        self.by_bucket.insert(bucket, slot);
    }

    /// Returns the coldest entry used strictly after `watermark`.
    pub(crate) fn next_after(&self, watermark: u64) -> Option<(u64, SlotId)> {
        self.by_recency
            .range((Bound::Excluded(watermark), Bound::Unbounded))
            .next()
            .map(|(last_used, slot)| (*last_used, *slot))
    }

    /// Entries from most to least recently used.
    pub(crate) fn iter_mru(&self) -> impl Iterator<Item = &Entry<F>> {
        self.by_recency
            .values()
            .rev()
            .filter_map(move |slot| self.entries.get(*slot))
    }

    /// Slots of entries that are not checked out, coldest first.
    pub(crate) fn idle_slots(&self) -> Vec<SlotId> {
        self.by_recency
            .values()
            .copied()
            .filter(|slot| self.entries.get(*slot).is_some_and(|e| !e.in_use()))
            .collect()
    }

    pub(crate) fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.by_bucket.len() != self.by_recency.len() {
            return Err(InvariantError::new(format!(
                "bucket index has {} entries, recency index has {}",
                self.by_bucket.len(),
                self.by_recency.len()
            )));
        }
        if self.entries.len() != self.by_bucket.len() {
            return Err(InvariantError::new(format!(
                "arena holds {} entries, index holds {}",
                self.entries.len(),
                self.by_bucket.len()
            )));
        }
        for (bucket, slot) in &self.by_bucket {
            let entry = self.entries.get(*slot).ok_or_else(|| {
                InvariantError::new(format!("{} points at free slot {:?}", bucket, slot))
            })?;
            if entry.bucket() != *bucket {
                return Err(InvariantError::new(format!(
                    "{} indexed under {}",
                    entry.bucket(),
                    bucket
                )));
            }
            if self.by_recency.get(&entry.last_used()) != Some(slot) {
                return Err(InvariantError::new(format!(
                    "{} missing from recency index at {}",
                    bucket,
                    entry.last_used()
                )));
            }
            if entry.last_used() > self.use_counter {
                return Err(InvariantError::new(format!(
                    "{} used at {} after counter {}",
                    bucket,
                    entry.last_used(),
                    self.use_counter
                )));
            }
        }
        Ok(())
    }
}
