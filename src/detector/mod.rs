//! Detector - Inference Seam
//!
//! ## Responsibilities
//!
//! - Trait boundary in front of the object-detection backend
//! - Raw detection output type shared with the ingest pipeline
//!
//! Tests substitute a mock implementation behind the trait.

pub mod yolo;

pub use yolo::{YoloConfig, YoloDetector};

use image::DynamicImage;

use crate::error::Result;

/// One raw model output in original-image pixel coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDetection {
    pub class_name: String,
    pub confidence: f32,
    /// x1, y1, x2, y2
    pub bbox: [i32; 4],
}

/// Object detection backend.
///
/// `detect` is synchronous and CPU-bound; callers run it on the blocking pool.
pub trait Detector: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<ObjectDetection>>;
}
