pub use crate::bucket::{BucketId, BucketInfo};
pub use crate::builder::BucketCacheBuilder;
pub use crate::cache::{BucketCache, BucketGuard, CacheStatistics, EntryDescription};
pub use crate::error::{CacheError, CacheResult};
pub use crate::memory::{MemoryUsage, Tier};
pub use crate::traits::{BucketFile, BucketLoader, FileError};

#[cfg(feature = "metrics")]
pub use crate::metrics::{
    BucketCacheMetricsSnapshot, MetricsExporter, MetricsReset, MetricsSnapshotProvider,
    PrometheusTextExporter,
};
