//! Observational metrics for the bucket cache.
//!
//! Recording, snapshotting and exporting are separate concerns:
//!
//! ```text
//!   ┌──────────────────────────────┐
//!   │ BucketCacheMetricsRecorder   │  written under the cache lock
//!   │ hit/miss/evict/return/...    │
//!   └──────────────┬───────────────┘
//!                  │ implemented by BucketCacheMetrics
//!                  ▼
//!   ┌──────────────────────────────┐    ┌──────────────────────────────┐
//!   │ MetricsSnapshotProvider<S>   │───►│ MetricsExporter<S>           │
//!   │ counters + gauges at a point │    │ e.g. PrometheusTextExporter  │
//!   └──────────────────────────────┘    └──────────────────────────────┘
//! ```
//!
//! Nothing in the cache reads these values back; they never change behavior.

pub mod exporter;
pub mod metrics_impl;
pub mod snapshot;
pub mod traits;

pub use exporter::PrometheusTextExporter;
pub use metrics_impl::BucketCacheMetrics;
pub use snapshot::BucketCacheMetricsSnapshot;
pub use traits::{
    BucketCacheMetricsRecorder, MetricsExporter, MetricsReset, MetricsSnapshotProvider,
};
