//! # Tiered Eviction
//!
//! Three policies free memory in a fixed order, each only while the budget
//! is still exceeded after the previous one:
//!
//! ```text
//!   evict_while_full()
//!   ═══════════════════════════════════════════════════════════════════════
//!
//!     usage.sum() <= limit.sum() ? ──yes──► done
//!            │ no
//!            ▼
//!     BodyEviction       strip body bytes            entry stays cached
//!            │ still full
//!            ▼
//!     HeaderEviction     strip header + body bytes   entry stays cached
//!            │ still full
//!            ▼
//!     MetadataEviction   remove the entry            entry destroyed
//! ```
//!
//! ## Cursors
//!
//! Each policy keeps a `last_used` watermark. Every idle entry used at or
//! before the watermark has already lost that policy's tier, so a pass
//! starts just after the cursor instead of rescanning from the coldest
//! entry:
//!
//! ```text
//!   recency order:  [1] [2] [3] [4] [5] [6] [7]      (LRU ──► MRU)
//!                            ▲
//!                      body cursor = 3
//!
//!   next body pass visits 4, 5, 6, 7 only.
//! ```
//!
//! Entries returned to the cache get a fresh `last_used` above every cursor,
//! so the watermark stays valid without per-entry state. Checked-out entries
//! are skipped without moving the cursor; they count nothing against the
//! budget while out and are revisited after they come back.
//!
//! Entries returned with unflushed changes are skipped as well. They keep
//! counting against the budget, so the cache can stay over its limit until
//! they are flushed. A flush moves them to the MRU end, above every cursor.
//!
//! A pass stops as soon as the total fits the limit, or the tier the policy
//! targets fits its own limit.

mod body;
mod header;
mod metadata;

pub(crate) use body::BodyEviction;
pub(crate) use header::HeaderEviction;
pub(crate) use metadata::MetadataEviction;

use crate::cache::index::EntryIndex;
use crate::ds::slot_arena::SlotId;
use crate::memory::{MemoryUsage, Tier};
use crate::traits::BucketFile;

/// A tier-stripping policy with its own eviction cursor.
pub(crate) trait EvictionPolicy {
    /// The tier this policy frees, and the usage dimension it watches.
    const TIER: Tier;

    fn cursor(&self) -> u64;

    fn advance_cursor(&mut self, last_used: u64);

    /// Frees this policy's tier from the idle entry in `slot`.
    /// Returns the bytes no longer counted against the budget.
    fn evict<F: BucketFile>(&mut self, index: &mut EntryIndex<F>, slot: SlotId) -> MemoryUsage;
}

/// Outcome of one policy pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EvictionPass {
    pub tier: Tier,
    pub entries: u64,
    pub freed: MemoryUsage,
}

impl EvictionPass {
    fn new(tier: Tier) -> Self {
        Self {
            tier,
            entries: 0,
            freed: MemoryUsage::ZERO,
        }
    }
}

/// Result of [`EvictionPolicies::evict_while_full`]; passes that did not
/// run report zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EvictionReport {
    pub body: EvictionPass,
    pub header: EvictionPass,
    pub metadata: EvictionPass,
}

impl EvictionReport {
    fn empty() -> Self {
        Self {
            body: EvictionPass::new(Tier::Body),
            header: EvictionPass::new(Tier::Header),
            metadata: EvictionPass::new(Tier::Metadata),
        }
    }

    fn pass_mut(&mut self, tier: Tier) -> &mut EvictionPass {
        match tier {
            Tier::Body => &mut self.body,
            Tier::Header => &mut self.header,
            Tier::Metadata => &mut self.metadata,
        }
    }

    pub fn passes(&self) -> [&EvictionPass; 3] {
        [&self.body, &self.header, &self.metadata]
    }

    pub fn is_empty(&self) -> bool {
        self.passes().iter().all(|pass| pass.entries == 0)
    }
}

#[inline]
fn over_budget(usage: &MemoryUsage, limit: &MemoryUsage) -> bool {
    usage.sum() > limit.sum()
}

/// Walks idle entries after `policy`'s cursor toward the MRU end, freeing
/// the policy's tier until the budget or the tier's own limit is met.
pub(crate) fn run_policy<F, P>(
    policy: &mut P,
    index: &mut EntryIndex<F>,
    usage: &mut MemoryUsage,
    limit: &MemoryUsage,
) -> EvictionPass
where
    F: BucketFile,
    P: EvictionPolicy,
{
    let tier = P::TIER;
    let mut pass = EvictionPass::new(tier);
    let mut position = policy.cursor();

    while let Some((last_used, slot)) = index.next_after(position) {
        position = last_used;
        if !index.get(slot).is_some_and(|entry| entry.evictable()) {
            continue;
        }
        if !over_budget(usage, limit) || tier.of(usage) <= tier.of(limit) {
            break;
        }
        let freed = policy.evict(index, slot);
        *usage -= freed;
        pass.entries += 1;
        pass.freed += freed;
        policy.advance_cursor(last_used);
    }
    pass
}

/// The three policies, in eviction order.
#[derive(Debug, Default)]
pub(crate) struct EvictionPolicies {
    body: BodyEviction,
    header: HeaderEviction,
    metadata: MetadataEviction,
}

impl EvictionPolicies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the watermark of the policy freeing `tier`.
    pub fn cursor(&self, tier: Tier) -> u64 {
        match tier {
            Tier::Body => self.body.cursor(),
            Tier::Header => self.header.cursor(),
            Tier::Metadata => self.metadata.cursor(),
        }
    }

    /// Runs body, header and metadata eviction in turn until `usage` fits
    /// `limit`. No-op when already within budget.
    pub fn evict_while_full<F: BucketFile>(
        &mut self,
        index: &mut EntryIndex<F>,
        usage: &mut MemoryUsage,
        limit: &MemoryUsage,
    ) -> EvictionReport {
        let mut report = EvictionReport::empty();
        for tier in Tier::EVICTION_ORDER {
            if !over_budget(usage, limit) {
                break;
            }
            *report.pass_mut(tier) = match tier {
                Tier::Body => run_policy(&mut self.body, index, usage, limit),
                Tier::Header => run_policy(&mut self.header, index, usage, limit),
                Tier::Metadata => run_policy(&mut self.metadata, index, usage, limit),
            };
        }
        report
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::bucket::BucketId;
    use crate::test_support::TestFile;
    use proptest::prelude::*;

    /// Builds an index of idle entries, coldest first, and returns it with
    /// the summed usage.
    pub(crate) fn idle_index(sizes: &[(u64, u64, u64)]) -> (EntryIndex<TestFile>, MemoryUsage) {
        let mut index = EntryIndex::with_capacity(sizes.len());
        let mut total = MemoryUsage::ZERO;
        for (raw, (m, h, b)) in sizes.iter().enumerate() {
            let slot = index.insert_checked_out(BucketId::from_raw(raw as u64));
            let usage = MemoryUsage::new(*m, *h, *b);
            index.get_mut(slot).unwrap().check_in(TestFile::new(*m, *h, *b), usage);
            total += usage;
        }
        (index, total)
    }

    pub(crate) fn cached(index: &EntryIndex<TestFile>, raw: u64) -> Option<MemoryUsage> {
        let slot = index.slot(&BucketId::from_raw(raw))?;
        index.get(slot).map(|entry| entry.cached_size())
    }

    // ==============================================
    // evict_while_full
    // ==============================================

    #[test]
    fn within_budget_is_noop() {
        let (mut index, mut usage) = idle_index(&[(2, 3, 5), (2, 3, 6)]);
        let mut policies = EvictionPolicies::new();
        let report =
            policies.evict_while_full(&mut index, &mut usage, &MemoryUsage::new(10, 10, 10));
        assert!(report.is_empty());
        assert_eq!(usage, MemoryUsage::new(4, 6, 11));
    }

    #[test]
    fn strips_body_from_coldest_first() {
        // 21 bytes against a 20 byte budget: one body strip is enough.
        let (mut index, mut usage) = idle_index(&[(2, 3, 5), (2, 3, 6)]);
        let mut policies = EvictionPolicies::new();
        let report =
            policies.evict_while_full(&mut index, &mut usage, &MemoryUsage::new(5, 5, 10));

        assert_eq!(report.body.entries, 1);
        assert_eq!(report.header.entries, 0);
        assert_eq!(usage, MemoryUsage::new(4, 6, 6));
        assert_eq!(cached(&index, 0), Some(MemoryUsage::new(2, 3, 0)));
        assert_eq!(cached(&index, 1), Some(MemoryUsage::new(2, 3, 6)));
        assert_eq!(policies.cursor(Tier::Body), 1);
    }

    #[test]
    fn falls_through_to_header_then_metadata() {
        let (mut index, mut usage) = idle_index(&[(4, 4, 4), (4, 4, 4), (4, 4, 4)]);
        let mut policies = EvictionPolicies::new();
        let report =
            policies.evict_while_full(&mut index, &mut usage, &MemoryUsage::new(2, 2, 2));

        // Bodies go first, then headers, then whole entries until the
        // 6 byte budget fits.
        assert_eq!(report.body.entries, 3);
        assert_eq!(report.header.entries, 3);
        assert_eq!(report.metadata.entries, 2);
        assert_eq!(usage, MemoryUsage::new(4, 0, 0));
        assert_eq!(index.len(), 1);
        assert_eq!(cached(&index, 2), Some(MemoryUsage::new(4, 0, 0)));
    }

    #[test]
    fn metadata_stops_once_budget_fits() {
        let (mut index, mut usage) = idle_index(&[(4, 0, 0), (4, 0, 0), (4, 0, 0)]);
        let mut policies = EvictionPolicies::new();
        let report =
            policies.evict_while_full(&mut index, &mut usage, &MemoryUsage::new(8, 0, 0));

        assert_eq!(report.metadata.entries, 1);
        assert_eq!(usage, MemoryUsage::new(8, 0, 0));
        assert_eq!(cached(&index, 0), None);
        assert!(cached(&index, 1).is_some());
    }

    #[test]
    fn policy_stops_when_its_tier_fits() {
        // Body is under its own limit, so the body pass frees nothing and
        // header eviction does the work.
        let (mut index, mut usage) = idle_index(&[(1, 10, 1), (1, 10, 1)]);
        let mut policies = EvictionPolicies::new();
        let report =
            policies.evict_while_full(&mut index, &mut usage, &MemoryUsage::new(2, 10, 2));

        assert_eq!(report.body.entries, 0);
        assert_eq!(report.header.entries, 1);
        assert_eq!(usage, MemoryUsage::new(2, 10, 1));
        assert_eq!(cached(&index, 0), Some(MemoryUsage::new(1, 0, 0)));
    }

    #[test]
    fn checked_out_entries_are_never_stripped() {
        let (mut index, mut usage) = idle_index(&[(1, 1, 5), (1, 1, 5)]);
        let slot = index.slot(&BucketId::from_raw(0)).unwrap();
        let (_file, withdrawn) = index.get_mut(slot).unwrap().check_out();
        usage -= withdrawn;

        let mut policies = EvictionPolicies::new();
        policies.evict_while_full(&mut index, &mut usage, &MemoryUsage::new(1, 1, 1));

        assert_eq!(cached(&index, 0), Some(MemoryUsage::ZERO));
        assert!(index.get(slot).unwrap().in_use());
        assert_eq!(cached(&index, 1), Some(MemoryUsage::new(1, 1, 0)));
        assert_eq!(policies.cursor(Tier::Body), 2);
        assert_eq!(usage, MemoryUsage::new(1, 1, 0));
    }

    #[test]
    fn second_pass_resumes_after_cursor() {
        let (mut index, mut usage) = idle_index(&[(0, 0, 5), (0, 0, 5), (0, 0, 5)]);
        let mut policies = EvictionPolicies::new();
        policies.evict_while_full(&mut index, &mut usage, &MemoryUsage::new(0, 0, 10));
        assert_eq!(policies.cursor(Tier::Body), 1);

        policies.evict_while_full(&mut index, &mut usage, &MemoryUsage::new(0, 0, 5));
        assert_eq!(policies.cursor(Tier::Body), 2);
        assert_eq!(cached(&index, 1), Some(MemoryUsage::ZERO));
        assert_eq!(cached(&index, 2), Some(MemoryUsage::new(0, 0, 5)));
    }

    #[test]
    fn unflushed_entries_are_passed_over() {
        let (mut index, mut usage) = idle_index(&[(1, 1, 5), (1, 1, 5), (1, 1, 5)]);
        let slot = index.slot(&BucketId::from_raw(0)).unwrap();
        let entry = index.get_mut(slot).unwrap();
        entry.file_mut().unwrap().dirty = true;
        entry.mark_unflushed();

        let mut policies = EvictionPolicies::new();
        let report =
            policies.evict_while_full(&mut index, &mut usage, &MemoryUsage::new(1, 1, 1));

        // Bucket 0 keeps everything; the others are removed around it.
        assert_eq!(cached(&index, 0), Some(MemoryUsage::new(1, 1, 5)));
        let file = index.get_mut(slot).unwrap().file_mut().unwrap();
        assert_eq!(file.usage, MemoryUsage::new(1, 1, 5));
        assert_eq!(report.metadata.entries, 2);
        assert_eq!(index.len(), 1);
        assert_eq!(usage, MemoryUsage::new(1, 1, 5));
        assert_eq!(policies.cursor(Tier::Metadata), 3);
    }

    // ==============================================
    // properties
    // ==============================================

    fn tier_totals(index: &EntryIndex<TestFile>) -> MemoryUsage {
        index.iter_mru().map(|entry| entry.cached_size()).sum()
    }

    fn sizes_strategy() -> impl Strategy<Value = Vec<(u64, u64, u64)>> {
        prop::collection::vec((1u64..8, 0u64..16, 0u64..32), 1..24)
    }

    fn limit_strategy() -> impl Strategy<Value = MemoryUsage> {
        (0u64..32, 0u64..64, 0u64..128).prop_map(|(m, h, b)| MemoryUsage::new(m, h, b))
    }

    proptest! {
        /// Headers are only stripped once bodies fit their own limit, and
        /// entries are only removed once headers do too.
        #[test]
        fn prop_tiers_are_freed_in_order(
            sizes in sizes_strategy(),
            first in limit_strategy(),
            second in limit_strategy(),
        ) {
            let (mut index, mut usage) = idle_index(&sizes);
            let mut policies = EvictionPolicies::new();

            for limit in [first, second] {
                let report = policies.evict_while_full(&mut index, &mut usage, &limit);
                let held = tier_totals(&index);
                prop_assert_eq!(held, usage);

                if report.header.entries > 0 || report.metadata.entries > 0 {
                    prop_assert!(held.body <= limit.body);
                }
                if report.metadata.entries > 0 {
                    prop_assert!(held.header <= limit.header);
                }
                prop_assert!(usage.sum() <= limit.sum());
                index.check_invariants().unwrap();
            }
        }
    }
}
