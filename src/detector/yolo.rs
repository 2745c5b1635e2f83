//! ONNX Runtime backend for YOLO-family detection models
//!
//! Letterbox preprocessing and output decoding follow the ultralytics export
//! layout `[1, 4 + num_classes, anchors]` with xywh box encoding. Inference
//! itself is a single session call into the external runtime.

use image::DynamicImage;
use ndarray::{Array2, Array3, Array4, Axis};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use std::path::Path;
use std::sync::Mutex;

use super::{Detector, ObjectDetection};
use crate::error::{Error, Result};

/// COCO class labels, index-aligned with the default ultralytics export
const COCO_NAMES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Detector configuration
#[derive(Debug, Clone)]
pub struct YoloConfig {
    /// Square model input size
    pub input_size: u32,
    /// Candidate floor applied before NMS
    pub min_confidence: f32,
    /// IoU threshold for greedy NMS
    pub iou_threshold: f32,
    /// Class labels, index-aligned with the model output
    pub class_names: Vec<String>,
}

impl Default for YoloConfig {
    fn default() -> Self {
        Self {
            input_size: 640,
            min_confidence: 0.25,
            iou_threshold: 0.45,
            class_names: COCO_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Letterbox mapping from model input back to original pixels
#[derive(Debug, Clone, Copy)]
struct PreprocessParams {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
    orig_w: u32,
    orig_h: u32,
}

/// Candidate detection before NMS, boxes in original pixels
#[derive(Debug, Clone)]
struct Candidate {
    bbox: [f32; 4],
    confidence: f32,
    class_id: usize,
}

/// ONNX Runtime session wrapper implementing [`Detector`]
pub struct YoloDetector {
    session: Mutex<Session>,
    config: YoloConfig,
}

impl YoloDetector {
    /// Load the model from an ONNX file
    pub fn load(model_path: impl AsRef<Path>, config: YoloConfig) -> Result<Self> {
        let session = Session::builder()
            .map_err(ort_err)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(ort_err)?
            .commit_from_file(model_path.as_ref())
            .map_err(ort_err)?;

        tracing::info!(
            path = %model_path.as_ref().display(),
            input_size = config.input_size,
            "Detection model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            config,
        })
    }

    /// Letterbox resize into a normalized NCHW tensor, gray padding
    fn preprocess(&self, image: &DynamicImage) -> (Array4<f32>, PreprocessParams) {
        let size = self.config.input_size;
        let (orig_w, orig_h) = (image.width(), image.height());

        let scale = (size as f32 / orig_w.max(1) as f32).min(size as f32 / orig_h.max(1) as f32);
        let new_w = ((orig_w as f32 * scale).round() as u32).clamp(1, size);
        let new_h = ((orig_h as f32 * scale).round() as u32).clamp(1, size);

        let resized = image
            .resize_exact(new_w, new_h, image::imageops::FilterType::Triangle)
            .to_rgb8();

        let pad_x = (size - new_w) as f32 / 2.0;
        let pad_y = (size - new_h) as f32 / 2.0;
        let offset_x = pad_x.floor() as usize;
        let offset_y = pad_y.floor() as usize;

        let mut canvas =
            Array3::<f32>::from_elem((3, size as usize, size as usize), 114.0 / 255.0);
        for (x, y, pixel) in resized.enumerate_pixels() {
            let (cx, cy) = (offset_x + x as usize, offset_y + y as usize);
            canvas[[0, cy, cx]] = f32::from(pixel.0[0]) / 255.0;
            canvas[[1, cy, cx]] = f32::from(pixel.0[1]) / 255.0;
            canvas[[2, cy, cx]] = f32::from(pixel.0[2]) / 255.0;
        }

        (
            canvas.insert_axis(Axis(0)),
            PreprocessParams {
                scale,
                pad_x,
                pad_y,
                orig_w,
                orig_h,
            },
        )
    }

    /// Single session run, output normalized to `[anchors, 4 + nc]`
    fn run_inference(&self, input: Array4<f32>) -> Result<Array2<f32>> {
        let input_value = ort::value::Value::from_array(input).map_err(ort_err)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| Error::Inference("Session lock poisoned".to_string()))?;

        let outputs = session.run(ort::inputs![input_value]).map_err(ort_err)?;

        let output = outputs
            .get("output0")
            .or_else(|| outputs.get("output"))
            .ok_or_else(|| Error::Inference("Model output node missing".to_string()))?;

        let (shape, data) = output.try_extract_tensor::<f32>().map_err(ort_err)?;

        if shape.len() != 3 {
            return Err(Error::Inference(format!(
                "Unexpected output shape: {shape:?}"
            )));
        }

        let features = self.config.class_names.len() + 4;
        let (dim1, dim2) = (shape[1] as usize, shape[2] as usize);

        let array = Array2::from_shape_vec((dim1, dim2), data.to_vec())
            .map_err(|e| Error::Inference(e.to_string()))?;

        if dim1 == features {
            // [features, anchors] export layout
            Ok(array.t().to_owned())
        } else if dim2 == features {
            Ok(array)
        } else {
            Err(Error::Inference(format!(
                "Output shape {shape:?} does not match {} classes",
                self.config.class_names.len()
            )))
        }
    }
}

impl Detector for YoloDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<ObjectDetection>> {
        let (input, params) = self.preprocess(image);
        let rows = self.run_inference(input)?;

        let candidates = decode_output(&rows, &params, &self.config);
        let kept = non_max_suppression(candidates, self.config.iou_threshold);

        tracing::debug!(detections = kept.len(), "Inference pass complete");

        Ok(kept
            .into_iter()
            .map(|c| ObjectDetection {
                class_name: self
                    .config
                    .class_names
                    .get(c.class_id)
                    .cloned()
                    .unwrap_or_else(|| format!("class_{}", c.class_id)),
                confidence: c.confidence,
                bbox: [
                    c.bbox[0].round() as i32,
                    c.bbox[1].round() as i32,
                    c.bbox[2].round() as i32,
                    c.bbox[3].round() as i32,
                ],
            })
            .collect())
    }
}

fn ort_err(e: ort::Error) -> Error {
    Error::Inference(e.to_string())
}

/// Decode raw output rows into candidates in original-image coordinates
fn decode_output(
    rows: &Array2<f32>,
    params: &PreprocessParams,
    config: &YoloConfig,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for row in rows.axis_iter(Axis(0)) {
        let (mut best_class, mut best_score) = (0usize, 0.0f32);
        for (idx, score) in row.iter().skip(4).enumerate() {
            if *score > best_score {
                best_class = idx;
                best_score = *score;
            }
        }
        if best_score < config.min_confidence {
            continue;
        }

        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        let x1 = (cx - w / 2.0 - params.pad_x) / params.scale;
        let y1 = (cy - h / 2.0 - params.pad_y) / params.scale;
        let x2 = (cx + w / 2.0 - params.pad_x) / params.scale;
        let y2 = (cy + h / 2.0 - params.pad_y) / params.scale;

        candidates.push(Candidate {
            bbox: [
                x1.clamp(0.0, params.orig_w as f32),
                y1.clamp(0.0, params.orig_h as f32),
                x2.clamp(0.0, params.orig_w as f32),
                y2.clamp(0.0, params.orig_h as f32),
            ],
            confidence: best_score,
            class_id: best_class,
        });
    }

    candidates
}

/// Greedy per-class non-maximum suppression
fn non_max_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && iou(&k.bbox, &candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

/// Intersection over union of two xyxy boxes
fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let ix = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let iy = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let inter = ix * iy;

    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter;

    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}
