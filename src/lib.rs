//! parkwatch - Two-Area Parking Occupancy Server
//!
//! Thin HTTP wrapper around a pretrained object-detection model for a
//! two-camera parking monitor.
//!
//! ## Architecture
//!
//! 1. AreaStateStore - last frame, detections and connection flag per area
//! 2. FramePipeline - upload ingestion: decode, detect, annotate, update
//! 3. Detector - inference seam (ONNX Runtime backend, mockable in tests)
//! 4. Annotator - box/label drawing and the disconnected placeholder
//! 5. DetectionMetrics - Prometheus mirroring of detection activity
//! 6. Streaming - MJPEG live feeds (annotated and raw)
//! 7. WebAPI - REST endpoints

pub mod area_state;
pub mod detector;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod render;
pub mod state;
pub mod stream;
pub mod web_api;

pub use error::{Error, Result};
pub use state::{AppConfig, AppState};
