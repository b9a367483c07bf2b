//! Error types for the bucket cache.
//!
//! ## Key Components
//!
//! - [`CacheError`]: Failures reported by the file layer that surface to the
//!   operation using the cache (load, consistency check on return, flush).
//! - [`InvariantError`]: Returned by
//!   [`BucketCache::check_invariants`](crate::cache::BucketCache::check_invariants)
//!   when internal bookkeeping has drifted.
//!
//! Contract violations by callers (checking out a bucket twice, erasing an
//! entry that is in use, renaming onto a non-empty target) are not errors:
//! they panic, since continuing would corrupt the memory accounting.

use std::fmt;

use thiserror::Error;

use crate::bucket::BucketId;
use crate::traits::FileError;

// ---------------------------------------------------------------------------
// CacheError
// ---------------------------------------------------------------------------

/// Error surfaced to the caller of a cache operation.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Constructing the file state on a cache miss failed. Nothing was
    /// inserted into the cache.
    #[error("failed to load {bucket}: {source}")]
    Load {
        bucket: BucketId,
        #[source]
        source: FileError,
    },

    /// The file failed its consistency check when returned to the cache.
    /// The entry is back in the cache and no longer checked out.
    #[error("{bucket} failed consistency check on return: {source}")]
    Inconsistent {
        bucket: BucketId,
        #[source]
        source: FileError,
    },

    /// Flushing a cached file to disk failed. The entry stays cached.
    #[error("failed to flush {bucket}: {source}")]
    Flush {
        bucket: BucketId,
        #[source]
        source: FileError,
    },
}

impl CacheError {
    /// Returns the bucket the failure belongs to.
    pub fn bucket(&self) -> BucketId {
        match self {
            CacheError::Load { bucket, .. }
            | CacheError::Inconsistent { bucket, .. }
            | CacheError::Flush { bucket, .. } => *bucket,
        }
    }
}

pub type CacheResult<T> = Result<T, CacheError>;

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal cache invariants are violated.
///
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
