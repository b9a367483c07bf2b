//! # Collaborator Traits
//!
//! The cache does not know how bucket files are laid out on disk. It talks to
//! the file layer through two narrow traits:
//!
//! ```text
//!   ┌──────────────────────────────┐        ┌──────────────────────────────┐
//!   │      BucketLoader            │ load   │        BucketFile            │
//!   │                              ├───────►│                              │
//!   │  load(bucket, create) → File │        │  memory_usage() → usage      │
//!   │  (may block on disk I/O,     │        │  evict(tier)                 │
//!   │   always called unlocked)    │        │  flush_to_disk()             │
//!   └──────────────────────────────┘        │  verify_consistent()         │
//!                                           │  bucket_info()               │
//!                                           │  is_empty() / relocate()     │
//!                                           └──────────────────────────────┘
//! ```
//!
//! ## Ownership
//!
//! A `BucketFile` is owned by exactly one cache entry. While an entry is
//! checked out the file moves into the [`BucketGuard`](crate::cache::BucketGuard),
//! so the cache physically cannot touch it until it is returned.

use crate::bucket::{BucketId, BucketInfo};
use crate::memory::{MemoryUsage, Tier};

/// Error type reported by file collaborators.
pub type FileError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// In-memory state of one bucket's on-disk file.
pub trait BucketFile: Send {
    /// Bytes currently held in memory, per tier.
    fn memory_usage(&self) -> MemoryUsage;

    /// Drops cached data for `tier`.
    ///
    /// [`Tier::Body`] drops body blobs only; [`Tier::Header`] drops headers
    /// and bodies. The cache never passes [`Tier::Metadata`]: metadata
    /// eviction removes the whole entry instead.
    fn evict(&mut self, tier: Tier);

    /// Writes every pending in-memory mutation to durable storage.
    fn flush_to_disk(&mut self) -> Result<(), FileError>;

    /// Checks that the file has no unflushed mutations and is internally
    /// consistent. Called every time a file is returned to the cache.
    fn verify_consistent(&self) -> Result<(), FileError>;

    fn bucket_info(&self) -> BucketInfo;

    /// Returns `true` if the file holds no data and has no backing file,
    /// i.e. it is a placeholder that may be replaced by a rename.
    fn is_empty(&self) -> bool;

    /// Tells the file it now represents `bucket`, after its backing file was
    /// renamed on disk.
    fn relocate(&mut self, bucket: BucketId);
}

/// Constructs bucket file state on a cache miss.
pub trait BucketLoader: Send + Sync {
    type File: BucketFile;

    /// Loads (or creates, if `create_if_missing`) the file for `bucket`.
    ///
    /// May perform disk I/O. Never called with the cache lock held.
    fn load(&self, bucket: BucketId, create_if_missing: bool) -> Result<Self::File, FileError>;
}
