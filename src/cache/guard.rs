//! Scoped checkout of one bucket file.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr;

use tracing::error;

use crate::bucket::BucketId;
use crate::cache::BucketCache;
use crate::error::CacheResult;
use crate::traits::BucketLoader;

/// Exclusive handle to a checked-out bucket file.
///
/// Dereferences to the file. Exactly one of the following ends the
/// checkout:
///
/// - [`release`](Self::release) returns the file and reports a failed
///   consistency check
/// - dropping the guard does the same but can only log the failure
/// - [`erase`](Self::erase) drops the entry and the file
/// - [`move_to`](Self::move_to) hands the file over to another bucket
pub struct BucketGuard<'c, L: BucketLoader> {
    cache: &'c BucketCache<L>,
    bucket: BucketId,
    // `None` once the checkout has ended.
    file: Option<L::File>,
}

impl<'c, L: BucketLoader> BucketGuard<'c, L> {
    pub(crate) fn new(cache: &'c BucketCache<L>, bucket: BucketId, file: L::File) -> Self {
        Self {
            cache,
            bucket,
            file: Some(file),
        }
    }

    pub fn bucket(&self) -> BucketId {
        self.bucket
    }

    fn take_file(&mut self) -> L::File {
        match self.file.take() {
            Some(file) => file,
            None => unreachable!("{} checkout already ended", self.bucket),
        }
    }

    /// Returns the file to the cache, making it evictable again.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Inconsistent`](crate::error::CacheError::Inconsistent)
    /// if the file has unflushed changes. The file is back in the cache
    /// either way.
    pub fn release(mut self) -> CacheResult<()> {
        let file = self.take_file();
        self.cache.return_to_cache(self.bucket, file)
    }

    /// Removes the bucket from the cache and drops its file without
    /// flushing.
    pub fn erase(mut self) {
        let file = self.take_file();
        self.cache.erase_checked_out(self.bucket, file);
    }

    /// Moves this bucket's file to `target`'s key, replacing `target`'s
    /// empty placeholder. Used after the backing file was renamed on disk,
    /// e.g. by a bucket split or join.
    ///
    /// Afterwards `target` holds this file, relocated to `target`'s bucket,
    /// and the source bucket is no longer cached.
    ///
    /// # Panics
    ///
    /// Panics if the guards belong to different caches, share a bucket, or
    /// if `target` is not empty.
    pub fn move_to(mut self, target: &mut BucketGuard<'c, L>) {
        assert!(
            ptr::eq(self.cache, target.cache),
            "cannot move {} between caches",
            self.bucket
        );
        let file = self.take_file();
        let placeholder = target.take_file();
        let moved = self
            .cache
            .rename(self.bucket, file, target.bucket, placeholder);
        target.file = Some(moved);
    }
}

impl<L: BucketLoader> Deref for BucketGuard<'_, L> {
    type Target = L::File;

    fn deref(&self) -> &L::File {
        match &self.file {
            Some(file) => file,
            None => unreachable!("{} checkout already ended", self.bucket),
        }
    }
}

impl<L: BucketLoader> DerefMut for BucketGuard<'_, L> {
    fn deref_mut(&mut self) -> &mut L::File {
        match &mut self.file {
            Some(file) => file,
            None => unreachable!("{} checkout already ended", self.bucket),
        }
    }
}

impl<L: BucketLoader> Drop for BucketGuard<'_, L> {
    fn drop(&mut self) {
        let Some(file) = self.file.take() else {
            return;
        };
        if let Err(err) = self.cache.return_to_cache(self.bucket, file) {
            error!(bucket = %self.bucket, error = %err, "dropped guard for inconsistent bucket");
        }
    }
}

impl<L: BucketLoader> fmt::Debug for BucketGuard<'_, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BucketGuard")
            .field("bucket", &self.bucket)
            .field("active", &self.file.is_some())
            .finish()
    }
}
