use std::io::Write;

use parking_lot::Mutex;

use crate::metrics::snapshot::BucketCacheMetricsSnapshot;
use crate::metrics::traits::MetricsExporter;

/// Prometheus text exporter for bucket cache snapshots.
///
/// Writes the Prometheus text exposition format so it can be scraped by
/// Prometheus or forwarded to an OpenTelemetry collector. Write errors are
/// ignored; metrics must never fail a storage operation.
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the exporter and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_metric(&self, kind: &str, suffix: &str, value: u64) {
        let name = self.metric_name(suffix);
        let mut writer = self.writer.lock();
        let _ = writeln!(writer, "# TYPE {} {}", name, kind);
        let _ = writeln!(writer, "{} {}", name, value);
    }

    fn write_counter(&self, suffix: &str, value: u64) {
        self.write_metric("counter", suffix, value);
    }

    fn write_gauge(&self, suffix: &str, value: u64) {
        self.write_metric("gauge", suffix, value);
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

impl<W: Write + Send> MetricsExporter<BucketCacheMetricsSnapshot> for PrometheusTextExporter<W> {
    fn export(&self, snapshot: &BucketCacheMetricsSnapshot) {
        self.write_counter("get_calls_total", snapshot.get_calls);
        self.write_counter("hits_total", snapshot.hits);
        self.write_counter("misses_total", snapshot.misses);
        self.write_counter("load_failures_total", snapshot.load_failures);
        self.write_counter("body_evictions_total", snapshot.body_evictions);
        self.write_counter("header_evictions_total", snapshot.header_evictions);
        self.write_counter("metadata_evictions_total", snapshot.metadata_evictions);
        self.write_counter("body_bytes_evicted_total", snapshot.body_bytes_evicted);
        self.write_counter("header_bytes_evicted_total", snapshot.header_bytes_evicted);
        self.write_counter(
            "metadata_bytes_evicted_total",
            snapshot.metadata_bytes_evicted,
        );
        self.write_counter("uncached_returns_total", snapshot.uncached_returns);
        self.write_counter("inconsistent_returns_total", snapshot.inconsistent_returns);
        self.write_counter("erases_total", snapshot.erases);
        self.write_counter("renames_total", snapshot.renames);
        self.write_counter("clears_total", snapshot.clears);
        self.write_counter("cleared_entries_total", snapshot.cleared_entries);

        self.write_gauge("entries", snapshot.entries as u64);
        self.write_gauge("entries_in_use", snapshot.entries_in_use as u64);
        self.write_gauge("metadata_bytes", snapshot.cached.metadata);
        self.write_gauge("header_bytes", snapshot.cached.header);
        self.write_gauge("body_bytes", snapshot.cached.body);
        self.write_gauge("limit_metadata_bytes", snapshot.limit.metadata);
        self.write_gauge("limit_header_bytes", snapshot.limit.header);
        self.write_gauge("limit_body_bytes", snapshot.limit.body);
    }
}
