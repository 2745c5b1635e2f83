//! API Routes

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use crate::area_state::{AreaId, CONFIDENCE_THRESHOLD};
use crate::error::{Error, Result};
use crate::models::{
    CombinedDetectionsResponse, CombinedStatusResponse, DetectionsResponse, ObjectCounts,
    StatusResponse, UploadResponse,
};
use crate::state::AppState;
use crate::stream::{mjpeg_response, FeedKind};

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & metrics
        .route("/health", get(super::health_check))
        .route("/custom_metrics", get(super::custom_metrics_info))
        .route("/metrics", get(metrics_exposition))
        // Combined routes
        .route("/combined/get_detections", get(get_combined_detections))
        .route("/combined/status", get(get_combined_status))
        // Per-area routes (a1/a2)
        .route("/:area/upload", post(upload_image))
        .route("/:area/get_detections", get(get_detections))
        .route("/:area/status", get(get_status))
        .route("/:area/video_feed", get(video_feed))
        .route("/:area/raw_feed", get(raw_feed))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            super::track_http,
        ))
        .with_state(state)
}

/// Upload a raw frame for an area
async fn upload_image(
    State(state): State<AppState>,
    Path(area): Path<String>,
    body: Bytes,
) -> Result<Json<UploadResponse>> {
    let area: AreaId = area.parse()?;

    if body.is_empty() {
        return Err(Error::Validation("No image data provided".to_string()));
    }

    let summary = state.pipeline.process_frame(area, body).await?;
    Ok(Json(summary))
}

/// Filtered detections for one area
async fn get_detections(
    State(state): State<AppState>,
    Path(area): Path<String>,
) -> Result<Response> {
    let area: AreaId = area.parse()?;
    let snapshot = state.store.get(area).observations_at(Utc::now()).await;

    if snapshot.detections.is_empty() {
        return Ok(Json(serde_json::json!({
            "status": "No detections yet",
            "object_counts": { "car": 0 },
            "connection_status": snapshot.connected,
            "area": area.as_str(),
        }))
        .into_response());
    }

    let high_confidence = snapshot.high_confidence_cars();
    let response = DetectionsResponse {
        object_counts: ObjectCounts {
            car: high_confidence.len(),
        },
        high_confidence_detections: high_confidence,
        total_detections_in_frame: snapshot.detections.len(),
        confidence_threshold: CONFIDENCE_THRESHOLD,
        connection_status: snapshot.connected,
        last_update: snapshot.last_update.map(|t| t.to_rfc3339()),
        area: area.as_str().to_string(),
    };

    Ok(Json(response).into_response())
}

/// Connection status for one area
async fn get_status(
    State(state): State<AppState>,
    Path(area): Path<String>,
) -> Result<Json<StatusResponse>> {
    let area: AreaId = area.parse()?;
    let status = state.store.get(area).status_at(Utc::now()).await;

    Ok(Json(StatusResponse {
        connection_status: status.connection_status,
        last_frame_time: status.last_frame_time,
        has_frame: status.has_frame,
        area: area.as_str().to_string(),
    }))
}

/// Annotated MJPEG live feed
async fn video_feed(State(state): State<AppState>, Path(area): Path<String>) -> Result<Response> {
    let area: AreaId = area.parse()?;
    mjpeg_response(state, area, FeedKind::Annotated).await
}

/// Raw MJPEG live feed
async fn raw_feed(State(state): State<AppState>, Path(area): Path<String>) -> Result<Response> {
    let area: AreaId = area.parse()?;
    mjpeg_response(state, area, FeedKind::Raw).await
}

/// Filtered detections from both areas
async fn get_combined_detections(
    State(state): State<AppState>,
) -> Json<CombinedDetectionsResponse> {
    let now = Utc::now();
    let a1 = state
        .store
        .get(AreaId::A1)
        .observations_at(now)
        .await
        .to_area_data();
    let a2 = state
        .store
        .get(AreaId::A2)
        .observations_at(now)
        .await
        .to_area_data();

    Json(CombinedDetectionsResponse {
        total_cars: a1.car_count + a2.car_count,
        area_a1: a1,
        area_a2: a2,
        confidence_threshold: CONFIDENCE_THRESHOLD,
    })
}

/// Connection status from both areas
async fn get_combined_status(State(state): State<AppState>) -> Json<CombinedStatusResponse> {
    let now = Utc::now();

    Json(CombinedStatusResponse {
        area_a1: state.store.get(AreaId::A1).status_at(now).await,
        area_a2: state.store.get(AreaId::A2).status_at(now).await,
    })
}

/// Prometheus exposition endpoint
async fn metrics_exposition(State(state): State<AppState>) -> Result<Response> {
    let body = state.metrics.render()?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response())
}
