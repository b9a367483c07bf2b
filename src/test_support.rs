//! In-memory bucket files for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::bucket::{BucketId, BucketInfo};
use crate::memory::{MemoryUsage, Tier};
use crate::traits::{BucketFile, BucketLoader, FileError};

#[derive(Debug, Clone)]
pub(crate) struct TestFile {
    pub bucket: BucketId,
    pub usage: MemoryUsage,
    pub dirty: bool,
    pub fail_flush: bool,
    pub flushes: u32,
    /// Shared so a test can observe relocations after the file is gone.
    pub relocations: Arc<AtomicUsize>,
}

impl TestFile {
    pub fn new(metadata: u64, header: u64, body: u64) -> Self {
        Self {
            bucket: BucketId::default(),
            usage: MemoryUsage::new(metadata, header, body),
            dirty: false,
            fail_flush: false,
            flushes: 0,
            relocations: Arc::default(),
        }
    }
}

impl BucketFile for TestFile {
    fn memory_usage(&self) -> MemoryUsage {
        self.usage
    }

    fn evict(&mut self, tier: Tier) {
        assert!(!self.dirty, "{} evicted with unflushed changes", self.bucket);
        self.usage = self.usage.without(tier);
    }

    fn flush_to_disk(&mut self) -> Result<(), FileError> {
        if self.fail_flush {
            return Err("flush failed".into());
        }
        self.dirty = false;
        self.flushes += 1;
        Ok(())
    }

    fn verify_consistent(&self) -> Result<(), FileError> {
        if self.dirty {
            return Err(format!("{} has unflushed changes", self.bucket).into());
        }
        Ok(())
    }

    fn bucket_info(&self) -> BucketInfo {
        BucketInfo {
            checksum: self.bucket.raw() as u32,
            document_count: self.usage.metadata as u32,
            total_document_size: (self.usage.header + self.usage.body) as u32,
            entry_count: self.usage.metadata as u32,
            used_file_size: self.usage.sum() as u32,
        }
    }

    fn is_empty(&self) -> bool {
        self.usage.is_zero()
    }

    fn relocate(&mut self, bucket: BucketId) {
        self.relocations.fetch_add(1, Ordering::Relaxed);
        self.bucket = bucket;
    }
}

/// Loader handing out files with preset sizes (zero if unknown).
#[derive(Debug, Default)]
pub(crate) struct TestLoader {
    sizes: Mutex<FxHashMap<BucketId, MemoryUsage>>,
    failing: Mutex<FxHashSet<BucketId>>,
    loads: AtomicUsize,
}

impl TestLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(self, raw: u64, metadata: u64, header: u64, body: u64) -> Self {
        self.sizes
            .lock()
            .insert(BucketId::from_raw(raw), MemoryUsage::new(metadata, header, body));
        self
    }

    pub fn fail(&self, raw: u64) {
        self.failing.lock().insert(BucketId::from_raw(raw));
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

impl BucketLoader for TestLoader {
    type File = TestFile;

    fn load(&self, bucket: BucketId, _create_if_missing: bool) -> Result<TestFile, FileError> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        if self.failing.lock().contains(&bucket) {
            return Err(format!("cannot read {}", bucket).into());
        }
        let usage = self
            .sizes
            .lock()
            .get(&bucket)
            .copied()
            .unwrap_or(MemoryUsage::ZERO);
        Ok(TestFile {
            bucket,
            usage,
            ..TestFile::new(0, 0, 0)
        })
    }
}
