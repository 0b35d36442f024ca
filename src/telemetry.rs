use crate::{ScreenshotKind, ThumbnailError};
use metrics::{counter, histogram, Counter, Histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Counters for one kind of snapshot
///
/// Handles are registered once per orchestrator; recording without an
/// installed recorder is a no-op.
#[derive(Clone)]
pub struct ThumbnailMetrics {
    pub cache_hits: Counter,
    pub cache_misses: Counter,
    pub skipped: Counter,
    pub capture_failures: Counter,
    pub transform_failures: Counter,
    pub thumbnails_cached: Counter,
    pub render_duration: Histogram,
}

impl ThumbnailMetrics {
    pub fn new(kind: ScreenshotKind) -> Self {
        let kind = kind.thumbnail_type();
        Self {
            cache_hits: counter!("thumbnail_cache_hits_total", "kind" => kind),
            cache_misses: counter!("thumbnail_cache_misses_total", "kind" => kind),
            skipped: counter!("thumbnail_compute_skipped_total", "kind" => kind),
            capture_failures: counter!("thumbnail_capture_failures_total", "kind" => kind),
            transform_failures: counter!("thumbnail_transform_failures_total", "kind" => kind),
            thumbnails_cached: counter!("thumbnails_cached_total", "kind" => kind),
            render_duration: histogram!("thumbnail_render_duration_seconds", "kind" => kind),
        }
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.increment(1);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.increment(1);
    }

    pub fn record_skipped(&self) {
        self.skipped.increment(1);
    }

    pub fn record_capture_failure(&self) {
        self.capture_failures.increment(1);
    }

    pub fn record_transform_failure(&self) {
        self.transform_failures.increment(1);
    }

    pub fn record_cached(&self) {
        self.thumbnails_cached.increment(1);
    }

    pub fn record_render(&self, duration: Duration) {
        self.render_duration.record(duration.as_secs_f64());
    }
}

/// Install a Prometheus recorder for this process and return the handle
/// used to render the collected metrics.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle, ThumbnailError> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ThumbnailError::MetricsError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        let metrics = ThumbnailMetrics::new(ScreenshotKind::Chart);
        metrics.record_cache_hit();
        metrics.record_cache_miss();
        metrics.record_capture_failure();
        metrics.record_render(Duration::from_millis(250));
    }
}
