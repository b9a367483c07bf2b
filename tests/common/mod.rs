// ==============================================
// SHARED MOCK FILE LAYER (integration)
// ==============================================
//
// A bucket "disk" backed by a map, plus a file type that tracks tiered
// memory usage and dirtiness the way a real bucket file would.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use bucketcache::bucket::{BucketId, BucketInfo};
use bucketcache::memory::{MemoryUsage, Tier};
use bucketcache::traits::{BucketFile, BucketLoader, FileError};

pub fn bucket(raw: u64) -> BucketId {
    BucketId::from_raw(raw)
}

/// Persisted bucket contents: what a reload brings back into memory.
#[derive(Debug, Default)]
pub struct MockDisk {
    files: Mutex<FxHashMap<BucketId, MemoryUsage>>,
    failing_loads: Mutex<Vec<BucketId>>,
    failing_flushes: Mutex<Vec<BucketId>>,
    loads: AtomicUsize,
}

impl MockDisk {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn store(&self, bucket: BucketId, usage: MemoryUsage) {
        self.files.lock().insert(bucket, usage);
    }

    pub fn stored(&self, bucket: BucketId) -> Option<MemoryUsage> {
        self.files.lock().get(&bucket).copied()
    }

    pub fn rename(&self, from: BucketId, to: BucketId) {
        let mut files = self.files.lock();
        if let Some(usage) = files.remove(&from) {
            files.insert(to, usage);
        }
    }

    pub fn fail_loads_of(&self, bucket: BucketId) {
        self.failing_loads.lock().push(bucket);
    }

    pub fn fail_flushes_of(&self, bucket: BucketId) {
        self.failing_flushes.lock().push(bucket);
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct MockFile {
    bucket: BucketId,
    disk: Arc<MockDisk>,
    usage: MemoryUsage,
    dirty: bool,
}

impl MockFile {
    /// Adds a document of the given sizes, leaving the file dirty.
    pub fn put(&mut self, metadata: u64, header: u64, body: u64) {
        self.usage += MemoryUsage::new(metadata, header, body);
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn bucket(&self) -> BucketId {
        self.bucket
    }
}

impl BucketFile for MockFile {
    fn memory_usage(&self) -> MemoryUsage {
        self.usage
    }

    fn evict(&mut self, tier: Tier) {
        assert!(!self.dirty, "{} evicted with unflushed changes", self.bucket);
        self.usage = self.usage.without(tier);
    }

    fn flush_to_disk(&mut self) -> Result<(), FileError> {
        if self.disk.failing_flushes.lock().contains(&self.bucket) {
            return Err(format!("disk full writing {}", self.bucket).into());
        }
        if self.dirty {
            let mut files = self.disk.files.lock();
            let stored = files.entry(self.bucket).or_default();
            // Only loaded tiers are rewritten; evicted tiers are on disk already.
            stored.metadata = stored.metadata.max(self.usage.metadata);
            stored.header = stored.header.max(self.usage.header);
            stored.body = stored.body.max(self.usage.body);
            self.dirty = false;
        }
        Ok(())
    }

    fn verify_consistent(&self) -> Result<(), FileError> {
        if self.dirty {
            return Err(format!("{} has unflushed changes", self.bucket).into());
        }
        Ok(())
    }

    fn bucket_info(&self) -> BucketInfo {
        let stored = self.disk.stored(self.bucket).unwrap_or_default();
        BucketInfo {
            checksum: (self.bucket.raw() as u32) ^ (stored.sum() as u32),
            document_count: stored.metadata as u32,
            total_document_size: (stored.header + stored.body) as u32,
            entry_count: stored.metadata as u32,
            used_file_size: stored.sum() as u32,
        }
    }

    fn is_empty(&self) -> bool {
        self.usage.is_zero() && !self.dirty
    }

    fn relocate(&mut self, bucket: BucketId) {
        self.bucket = bucket;
    }
}

#[derive(Debug, Clone)]
pub struct MockLoader {
    disk: Arc<MockDisk>,
}

impl MockLoader {
    pub fn new(disk: Arc<MockDisk>) -> Self {
        Self { disk }
    }

    pub fn disk(&self) -> &Arc<MockDisk> {
        &self.disk
    }
}

impl BucketLoader for MockLoader {
    type File = MockFile;

    fn load(&self, bucket: BucketId, create_if_missing: bool) -> Result<MockFile, FileError> {
        self.disk.loads.fetch_add(1, Ordering::SeqCst);
        if self.disk.failing_loads.lock().contains(&bucket) {
            return Err(format!("i/o error reading {}", bucket).into());
        }
        let usage = match self.disk.stored(bucket) {
            Some(usage) => usage,
            None if create_if_missing => MemoryUsage::ZERO,
            None => return Err(format!("{} does not exist", bucket).into()),
        };
        Ok(MockFile {
            bucket,
            disk: Arc::clone(&self.disk),
            usage,
            dirty: false,
        })
    }
}
