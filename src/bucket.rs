//! Bucket identity and per-bucket metadata.
//!
//! A bucket is the partition of the document space that the cache keys on.
//! The cache never interprets a [`BucketId`] beyond equality, hashing and
//! ordering; the bit layout belongs to the distribution layer.

use std::fmt;

/// Identifier of a bucket, the key of every cache entry.
///
/// The upper 6 bits carry the number of used location bits, the rest the
/// raw bucket location, matching the on-disk naming of bucket files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BucketId(u64);

impl BucketId {
    const USED_BITS_SHIFT: u32 = 58;
    const LOCATION_MASK: u64 = (1 << Self::USED_BITS_SHIFT) - 1;

    /// Creates a bucket id from its raw 64-bit representation.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Creates a bucket id from a used-bit count and a location.
    ///
    /// Location bits above `used_bits` are masked off.
    pub fn new(used_bits: u8, location: u64) -> Self {
        let used_bits = used_bits.min(Self::USED_BITS_SHIFT as u8);
        let mask = if used_bits as u32 == Self::USED_BITS_SHIFT {
            Self::LOCATION_MASK
        } else {
            (1u64 << used_bits) - 1
        };
        Self(((used_bits as u64) << Self::USED_BITS_SHIFT) | (location & mask))
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn used_bits(self) -> u8 {
        (self.0 >> Self::USED_BITS_SHIFT) as u8
    }

    #[inline]
    pub const fn location(self) -> u64 {
        self.0 & Self::LOCATION_MASK
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BucketId(0x{:016x})", self.0)
    }
}

impl From<u64> for BucketId {
    fn from(raw: u64) -> Self {
        Self::from_raw(raw)
    }
}

/// Snapshot of a bucket's persisted metadata, reported by
/// [`BucketCache::flush_dirty_entries`](crate::cache::BucketCache::flush_dirty_entries).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BucketInfo {
    pub checksum: u32,
    pub document_count: u32,
    pub total_document_size: u32,
    /// Number of slots (documents and remove entries) in the file.
    pub entry_count: u32,
    pub used_file_size: u32,
}

impl BucketInfo {
    /// Returns `true` if the bucket holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }
}

impl fmt::Display for BucketInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BucketInfo(crc 0x{:08x}, docs {}, size {}, entries {}, file {})",
            self.checksum,
            self.document_count,
            self.total_document_size,
            self.entry_count,
            self.used_file_size
        )
    }
}
