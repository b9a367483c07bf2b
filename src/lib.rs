//! bucketcache: a bounded cache of bucket file state with tiered eviction.
//!
//! A storage node keeps the in-memory state of recently used bucket files
//! in one [`BucketCache`](cache::BucketCache). Each file holds three tiers
//! of data: metadata, headers and bodies. When the cache grows past its
//! budget, bodies of the least recently used files are dropped first, then
//! headers, and only then whole entries.
//!
//! ## Modules
//!
//! - [`cache`]: the cache itself and the checkout guard
//! - [`builder`]: configuration
//! - [`traits`]: what the cache needs from the file layer
//! - [`memory`] and [`bucket`]: value types shared with the file layer
//! - [`metrics`]: counters, snapshots and a Prometheus text exporter

pub mod bucket;
pub mod builder;
pub mod cache;
pub(crate) mod ds;
pub mod error;
pub mod memory;
pub mod prelude;
pub mod traits;

pub(crate) mod policy;

#[cfg(feature = "metrics")]
pub mod metrics;

#[cfg(test)]
mod test_support;

pub use crate::bucket::{BucketId, BucketInfo};
pub use crate::builder::BucketCacheBuilder;
pub use crate::cache::{BucketCache, BucketGuard};
pub use crate::error::{CacheError, CacheResult, InvariantError};
pub use crate::memory::{MemoryUsage, Tier};
