//! DetectionMetrics - Prometheus Mirroring
//!
//! ## Responsibilities
//!
//! - Per-area occupancy gauges
//! - Car detection counter and confidence histogram
//! - Per-endpoint HTTP request counter and latency histogram
//! - Exposition rendering for the /metrics endpoint
//!
//! Side effect only; nothing downstream consumes these values.

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::area_state::AreaId;
use crate::error::{Error, Result};

pub const METRIC_OCCUPIED_A1: &str = "parkwatch_occupied_slots_area_a1";
pub const METRIC_OCCUPIED_A2: &str = "parkwatch_occupied_slots_area_a2";
pub const METRIC_CONFIDENCE: &str = "parkwatch_detection_confidence_score_histogram";
pub const METRIC_DETECTIONS_TOTAL: &str = "parkwatch_car_detections_total";
pub const METRIC_HTTP_REQUESTS: &str = "parkwatch_http_requests_total";
pub const METRIC_HTTP_DURATION: &str = "parkwatch_http_request_duration_seconds";

/// Custom detection metrics with their own registry
pub struct DetectionMetrics {
    registry: Registry,
    occupied_a1: IntGauge,
    occupied_a2: IntGauge,
    confidence_scores: HistogramVec,
    detections_total: IntCounterVec,
    http_requests: IntCounterVec,
    http_duration: HistogramVec,
}

impl DetectionMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let occupied_a1 = IntGauge::new(
            METRIC_OCCUPIED_A1,
            "Number of occupied parking slots in Area A1",
        )
        .map_err(setup_err)?;

        let occupied_a2 = IntGauge::new(
            METRIC_OCCUPIED_A2,
            "Number of occupied parking slots in Area A2",
        )
        .map_err(setup_err)?;

        let confidence_scores = HistogramVec::new(
            HistogramOpts::new(
                METRIC_CONFIDENCE,
                "Histogram of detection confidence scores for detected cars",
            )
            .buckets(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0]),
            &["area"],
        )
        .map_err(setup_err)?;

        let detections_total = IntCounterVec::new(
            Opts::new(
                METRIC_DETECTIONS_TOTAL,
                "Total number of car detections by the model",
            ),
            &["area"],
        )
        .map_err(setup_err)?;

        let http_requests = IntCounterVec::new(
            Opts::new(
                METRIC_HTTP_REQUESTS,
                "Total HTTP requests handled, by endpoint",
            ),
            &["endpoint", "method", "status"],
        )
        .map_err(setup_err)?;

        let http_duration = HistogramVec::new(
            HistogramOpts::new(
                METRIC_HTTP_DURATION,
                "HTTP request latency in seconds, by endpoint",
            ),
            &["endpoint", "method"],
        )
        .map_err(setup_err)?;

        registry
            .register(Box::new(occupied_a1.clone()))
            .map_err(setup_err)?;
        registry
            .register(Box::new(occupied_a2.clone()))
            .map_err(setup_err)?;
        registry
            .register(Box::new(confidence_scores.clone()))
            .map_err(setup_err)?;
        registry
            .register(Box::new(detections_total.clone()))
            .map_err(setup_err)?;
        registry
            .register(Box::new(http_requests.clone()))
            .map_err(setup_err)?;
        registry
            .register(Box::new(http_duration.clone()))
            .map_err(setup_err)?;

        Ok(Self {
            registry,
            occupied_a1,
            occupied_a2,
            confidence_scores,
            detections_total,
            http_requests,
            http_duration,
        })
    }

    /// Record one above-threshold car detection
    pub fn observe_detection(&self, area: AreaId, confidence: f32) {
        self.detections_total
            .with_label_values(&[area.as_str()])
            .inc();
        self.confidence_scores
            .with_label_values(&[area.as_str()])
            .observe(f64::from(confidence));
    }

    /// Set the per-frame occupancy gauge for an area
    pub fn set_occupancy(&self, area: AreaId, cars: usize) {
        self.gauge(area).set(cars as i64);
    }

    /// Current occupancy gauge value for an area
    pub fn occupancy(&self, area: AreaId) -> i64 {
        self.gauge(area).get()
    }

    /// Total car detections counted for an area
    pub fn detections_total(&self, area: AreaId) -> u64 {
        self.detections_total.with_label_values(&[area.as_str()]).get()
    }

    /// Record one completed HTTP request
    pub fn observe_http(&self, endpoint: &str, method: &str, status: u16, seconds: f64) {
        self.http_requests
            .with_label_values(&[endpoint, method, &status.to_string()])
            .inc();
        self.http_duration
            .with_label_values(&[endpoint, method])
            .observe(seconds);
    }

    /// Request count for one endpoint/method/status combination
    pub fn http_requests(&self, endpoint: &str, method: &str, status: u16) -> u64 {
        self.http_requests
            .with_label_values(&[endpoint, method, &status.to_string()])
            .get()
    }

    fn gauge(&self, area: AreaId) -> &IntGauge {
        match area {
            AreaId::A1 => &self.occupied_a1,
            AreaId::A2 => &self.occupied_a2,
        }
    }

    /// Render the registry in Prometheus exposition format
    pub fn render(&self) -> Result<String> {
        TextEncoder::new()
            .encode_to_string(&self.registry.gather())
            .map_err(|e| Error::Internal(format!("Metrics encoding failed: {e}")))
    }

    /// Metric names served by /custom_metrics
    pub fn available_metrics() -> [&'static str; 4] {
        [
            METRIC_OCCUPIED_A1,
            METRIC_OCCUPIED_A2,
            METRIC_CONFIDENCE,
            METRIC_DETECTIONS_TOTAL,
        ]
    }
}

fn setup_err(e: prometheus::Error) -> Error {
    Error::Internal(format!("Metrics setup failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupancy_gauge_tracks_per_area() {
        let metrics = DetectionMetrics::new().unwrap();
        metrics.set_occupancy(AreaId::A1, 3);
        metrics.set_occupancy(AreaId::A2, 1);

        assert_eq!(metrics.occupancy(AreaId::A1), 3);
        assert_eq!(metrics.occupancy(AreaId::A2), 1);
    }

    #[test]
    fn detection_counter_increments() {
        let metrics = DetectionMetrics::new().unwrap();
        metrics.observe_detection(AreaId::A1, 0.92);
        metrics.observe_detection(AreaId::A1, 0.88);

        assert_eq!(metrics.detections_total(AreaId::A1), 2);
        assert_eq!(metrics.detections_total(AreaId::A2), 0);
    }

    #[test]
    fn http_metrics_record_per_endpoint() {
        let metrics = DetectionMetrics::new().unwrap();
        metrics.observe_http("/:area/status", "GET", 200, 0.012);
        metrics.observe_http("/:area/status", "GET", 200, 0.008);
        metrics.observe_http("/:area/upload", "POST", 400, 0.002);

        assert_eq!(metrics.http_requests("/:area/status", "GET", 200), 2);
        assert_eq!(metrics.http_requests("/:area/upload", "POST", 400), 1);
        assert_eq!(metrics.http_requests("/:area/upload", "POST", 200), 0);

        let exposition = metrics.render().unwrap();
        assert!(exposition.contains(METRIC_HTTP_REQUESTS));
        assert!(exposition.contains(METRIC_HTTP_DURATION));
    }

    #[test]
    fn render_includes_custom_metric_names() {
        let metrics = DetectionMetrics::new().unwrap();
        metrics.set_occupancy(AreaId::A1, 2);
        metrics.observe_detection(AreaId::A2, 0.95);

        let exposition = metrics.render().unwrap();
        for name in DetectionMetrics::available_metrics() {
            assert!(exposition.contains(name), "missing {name}");
        }
    }
}
