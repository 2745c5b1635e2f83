//! FramePipeline - Upload Ingestion
//!
//! ## Responsibilities
//!
//! - Decode uploaded frames and invoke the detection backend
//! - Annotate matches above the confidence threshold
//! - Update per-area state and mirror detection metrics
//!
//! Decode, inference and encode are CPU-bound and run on the blocking pool;
//! one upload occupies one blocking thread for the duration of inference.

use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;

use crate::area_state::{AreaId, AreaStateStore, CONFIDENCE_THRESHOLD};
use crate::detector::Detector;
use crate::error::{Error, Result};
use crate::metrics::DetectionMetrics;
use crate::models::{Detection, UploadResponse};
use crate::render::{encode_jpeg, Annotator};

/// Upload processing pipeline shared by the per-area upload handlers
pub struct FramePipeline {
    store: Arc<AreaStateStore>,
    detector: Arc<dyn Detector>,
    metrics: Arc<DetectionMetrics>,
    annotator: Arc<Annotator>,
}

impl FramePipeline {
    pub fn new(
        store: Arc<AreaStateStore>,
        detector: Arc<dyn Detector>,
        metrics: Arc<DetectionMetrics>,
        annotator: Arc<Annotator>,
    ) -> Self {
        Self {
            store,
            detector,
            metrics,
            annotator,
        }
    }

    /// Process one uploaded frame for an area.
    ///
    /// Connection flag, timestamp and raw frame are stored before the
    /// detection pass; they stay in place when the pass fails.
    pub async fn process_frame(&self, area: AreaId, img_bytes: Bytes) -> Result<UploadResponse> {
        tracing::info!(area = %area, bytes = img_bytes.len(), "Processing uploaded frame");

        let state = self.store.get(area);
        state.mark_received(img_bytes.clone(), Utc::now()).await;

        let detector = Arc::clone(&self.detector);
        let annotator = Arc::clone(&self.annotator);
        let (annotated, detections) =
            tokio::task::spawn_blocking(move || run_pass(&*detector, &annotator, area, &img_bytes))
                .await
                .map_err(|e| Error::Internal(format!("Detection task failed: {e}")))?
                .inspect_err(|e| {
                    tracing::error!(area = %area, error = %e, "Detection pass failed");
                })?;

        state
            .record_pass(Bytes::from(annotated), detections.clone())
            .await;

        self.metrics.set_occupancy(area, detections.len());
        for detection in &detections {
            if detection.confidence > CONFIDENCE_THRESHOLD {
                self.metrics.observe_detection(area, detection.confidence);
            }
        }

        tracing::info!(area = %area, cars = detections.len(), "Frame processed");

        Ok(UploadResponse {
            status: "Image processed".to_string(),
            detections,
            area: area.as_str().to_string(),
        })
    }
}

/// Decode, detect, annotate and re-encode one frame
fn run_pass(
    detector: &dyn Detector,
    annotator: &Annotator,
    area: AreaId,
    img_bytes: &[u8],
) -> Result<(Vec<u8>, Vec<Detection>)> {
    let image = image::load_from_memory(img_bytes).map_err(|e| Error::Decode(e.to_string()))?;

    let raw_detections = detector.detect(&image)?;

    let detections: Vec<Detection> = raw_detections
        .into_iter()
        .filter(|d| d.class_name == "car")
        .map(|d| Detection {
            class: d.class_name,
            confidence: d.confidence,
            bounding_box: d.bbox,
            area: area.as_str().to_string(),
        })
        .collect();

    // Only matches above the query threshold get boxes drawn
    let to_draw: Vec<Detection> = detections
        .iter()
        .filter(|d| d.confidence > CONFIDENCE_THRESHOLD)
        .cloned()
        .collect();

    let annotated = annotator.annotate(&image, area, &to_draw);
    let jpeg = encode_jpeg(&annotated)?;

    Ok((jpeg, detections))
}
