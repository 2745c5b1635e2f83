//! Application state
//!
//! Holds configuration and the shared components

use std::path::PathBuf;
use std::sync::Arc;

use crate::area_state::AreaStateStore;
use crate::detector::Detector;
use crate::error::Result;
use crate::ingest::FramePipeline;
use crate::metrics::DetectionMetrics;
use crate::render::Annotator;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Path to the ONNX detection model
    pub model_path: PathBuf,
    /// Optional label font for annotations
    pub font_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            model_path: std::env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("fine-best.onnx")),
            font_path: std::env::var("FONT_PATH").ok().map(PathBuf::from),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<AreaStateStore>,
    pub pipeline: Arc<FramePipeline>,
    pub metrics: Arc<DetectionMetrics>,
    pub annotator: Arc<Annotator>,
}

impl AppState {
    /// Wire up the shared components around a detection backend
    pub fn new(config: AppConfig, detector: Arc<dyn Detector>) -> Result<Self> {
        let store = Arc::new(AreaStateStore::new());
        let metrics = Arc::new(DetectionMetrics::new()?);
        let annotator = Arc::new(Annotator::new(config.font_path.clone()));
        let pipeline = Arc::new(FramePipeline::new(
            Arc::clone(&store),
            detector,
            Arc::clone(&metrics),
            Arc::clone(&annotator),
        ));

        Ok(Self {
            config,
            store,
            pipeline,
            metrics,
            annotator,
        })
    }
}
