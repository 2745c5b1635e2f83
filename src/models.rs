//! Shared models and types for parkwatch
//!
//! This module contains the JSON shapes served by the API,
//! shared across modules to avoid circular dependencies.

use serde::{Deserialize, Serialize};

/// One detection record kept for an area: class label, confidence and pixel box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class: String,
    pub confidence: f32,
    /// x1, y1, x2, y2 in original image pixels
    pub bounding_box: [i32; 4],
    pub area: String,
}

/// Upload summary returned by POST /{area}/upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub status: String,
    /// All car detections of the pass, unfiltered
    pub detections: Vec<Detection>,
    pub area: String,
}

/// Per-class counts served by the detection queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectCounts {
    pub car: usize,
}

/// GET /{area}/get_detections once at least one pass recorded detections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionsResponse {
    pub object_counts: ObjectCounts,
    pub high_confidence_detections: Vec<Detection>,
    pub total_detections_in_frame: usize,
    pub confidence_threshold: f32,
    pub connection_status: bool,
    pub last_update: Option<String>,
    pub area: String,
}

/// GET /{area}/status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub connection_status: bool,
    pub last_frame_time: Option<String>,
    pub has_frame: bool,
    pub area: String,
}

/// Per-area block of GET /combined/get_detections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaDetectionData {
    /// High-confidence car count
    pub car_count: usize,
    /// High-confidence detections only
    pub detections: Vec<Detection>,
    pub connection_status: bool,
}

/// GET /combined/get_detections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedDetectionsResponse {
    pub total_cars: usize,
    pub area_a1: AreaDetectionData,
    pub area_a2: AreaDetectionData,
    pub confidence_threshold: f32,
}

/// Per-area block of GET /combined/status (no `area` field, as served)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaStatusData {
    pub connection_status: bool,
    pub last_frame_time: Option<String>,
    pub has_frame: bool,
}

/// GET /combined/status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedStatusResponse {
    pub area_a1: AreaStatusData,
    pub area_a2: AreaStatusData,
}
