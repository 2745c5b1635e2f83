//! AreaStateStore - Per-Area Detection State
//!
//! ## Responsibilities
//!
//! - Hold the latest raw/annotated frame per monitored area
//! - Hold the detection records of the most recent inference pass
//! - Lazily derive the connection flag from the staleness window
//!
//! Frame bytes sit behind their own lock; detections, last-update time and the
//! connection flag sit behind a second, independent lock. A reader can observe
//! a frame and detections from different uploads. That non-atomic snapshot
//! matches the partial guarding of the upstream protocol and is accepted.

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::{AreaDetectionData, AreaStatusData, Detection};

/// Confidence threshold applied at query time and annotation time
pub const CONFIDENCE_THRESHOLD: f32 = 0.8;

/// Seconds without an upload after which an area counts as disconnected
pub const STALENESS_WINDOW_SECS: i64 = 10;

/// Monitored area identifier (fixed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AreaId {
    A1,
    A2,
}

impl AreaId {
    pub const ALL: [AreaId; 2] = [AreaId::A1, AreaId::A2];

    pub fn as_str(&self) -> &'static str {
        match self {
            AreaId::A1 => "A1",
            AreaId::A2 => "A2",
        }
    }
}

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AreaId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A1" => Ok(AreaId::A1),
            "A2" => Ok(AreaId::A2),
            other => Err(crate::Error::NotFound(format!("Unknown area: {other}"))),
        }
    }
}

/// Latest frame buffers, each overwritten by the next upload / pass
#[derive(Debug, Default)]
struct FrameBuffers {
    raw: Option<Bytes>,
    annotated: Option<Bytes>,
}

/// Detection bookkeeping for one area
#[derive(Debug, Default)]
struct Observations {
    /// Car detections of the most recent pass, replaced wholesale
    detections: Vec<Detection>,
    last_update: Option<DateTime<Utc>>,
    connected: bool,
}

impl Observations {
    /// Recompute `connected` from the staleness window. Only ever runs on a
    /// read, so a caller racing the boundary may still see a stale true.
    fn refresh_connected(&mut self, now: DateTime<Utc>) {
        if let Some(last) = self.last_update {
            if now.signed_duration_since(last) > Duration::seconds(STALENESS_WINDOW_SECS) {
                self.connected = false;
            }
        }
    }
}

/// State for one monitored area
#[derive(Debug, Default)]
pub struct AreaState {
    frames: RwLock<FrameBuffers>,
    observations: RwLock<Observations>,
}

impl AreaState {
    /// Mark a frame as received: connection up, timestamp stamped, raw bytes
    /// stored. Runs before decode/inference so these fields stay in place
    /// when the pass fails.
    pub async fn mark_received(&self, raw: Bytes, now: DateTime<Utc>) {
        {
            let mut obs = self.observations.write().await;
            obs.connected = true;
            obs.last_update = Some(now);
        }
        self.frames.write().await.raw = Some(raw);
    }

    /// Store the outcome of a successful detection pass
    pub async fn record_pass(&self, annotated: Bytes, detections: Vec<Detection>) {
        self.frames.write().await.annotated = Some(annotated);
        self.observations.write().await.detections = detections;
    }

    pub async fn raw_frame(&self) -> Option<Bytes> {
        self.frames.read().await.raw.clone()
    }

    pub async fn annotated_frame(&self) -> Option<Bytes> {
        self.frames.read().await.annotated.clone()
    }

    pub async fn has_frame(&self) -> bool {
        self.frames.read().await.raw.is_some()
    }

    /// Connection status snapshot, refreshing the staleness-derived flag
    pub async fn status_at(&self, now: DateTime<Utc>) -> AreaStatusData {
        let has_frame = self.has_frame().await;
        let mut obs = self.observations.write().await;
        obs.refresh_connected(now);

        AreaStatusData {
            connection_status: obs.connected,
            last_frame_time: obs.last_update.map(|t| t.to_rfc3339()),
            has_frame,
        }
    }

    /// Stored detections plus connection info, refreshing the flag
    pub async fn observations_at(&self, now: DateTime<Utc>) -> ObservationSnapshot {
        let mut obs = self.observations.write().await;
        obs.refresh_connected(now);

        ObservationSnapshot {
            detections: obs.detections.clone(),
            connected: obs.connected,
            last_update: obs.last_update,
        }
    }
}

/// Copy of one area's detection bookkeeping at read time
#[derive(Debug, Clone)]
pub struct ObservationSnapshot {
    pub detections: Vec<Detection>,
    pub connected: bool,
    pub last_update: Option<DateTime<Utc>>,
}

impl ObservationSnapshot {
    /// Detections of class "car" above the confidence threshold
    pub fn high_confidence_cars(&self) -> Vec<Detection> {
        filter_high_confidence(&self.detections)
    }

    /// Filtered per-area block for the combined endpoint
    pub fn to_area_data(&self) -> AreaDetectionData {
        let detections = self.high_confidence_cars();
        AreaDetectionData {
            car_count: detections.len(),
            detections,
            connection_status: self.connected,
        }
    }
}

/// Filter detections to class "car" strictly above the confidence threshold
pub fn filter_high_confidence(detections: &[Detection]) -> Vec<Detection> {
    detections
        .iter()
        .filter(|d| d.class == "car" && d.confidence > CONFIDENCE_THRESHOLD)
        .cloned()
        .collect()
}

/// In-memory store mapping each fixed area to its state
pub struct AreaStateStore {
    areas: HashMap<AreaId, Arc<AreaState>>,
}

impl AreaStateStore {
    pub fn new() -> Self {
        let areas = AreaId::ALL
            .iter()
            .map(|id| (*id, Arc::new(AreaState::default())))
            .collect();
        Self { areas }
    }

    pub fn get(&self, area: AreaId) -> Arc<AreaState> {
        // The map is fixed at construction, both keys always present
        Arc::clone(&self.areas[&area])
    }
}

impl Default for AreaStateStore {
    fn default() -> Self {
        Self::new()
    }
}
