//! WebAPI - REST API Endpoints
//!
//! ## Responsibilities
//!
//! - HTTP API routes
//! - Request validation
//! - Response formatting
//! - Per-endpoint request metrics

mod routes;

pub use routes::create_router;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::json;
use std::time::Instant;

use crate::area_state::AreaId;
use crate::metrics::DetectionMetrics;
use crate::state::AppState;

/// Routes excluded from HTTP request metrics: the long-lived feeds never
/// complete, and health probes would dominate the counters
const UNTRACKED_ENDPOINTS: [&str; 3] = ["/:area/video_feed", "/:area/raw_feed", "/health"];

/// Middleware recording per-endpoint request counts and latency
pub(crate) async fn track_http(
    State(state): State<AppState>,
    matched_path: Option<MatchedPath>,
    request: Request,
    next: Next,
) -> Response {
    let endpoint = matched_path.map(|p| p.as_str().to_string());
    let method = request.method().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(endpoint) = endpoint {
        if !UNTRACKED_ENDPOINTS.contains(&endpoint.as_str()) {
            state.metrics.observe_http(
                &endpoint,
                &method,
                response.status().as_u16(),
                start.elapsed().as_secs_f64(),
            );
        }
    }

    response
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let now = Utc::now();

    let mut areas = serde_json::Map::new();
    for area in AreaId::ALL {
        let status = state.store.get(area).status_at(now).await;
        areas.insert(
            area.as_str().to_string(),
            json!({
                "connection_status": status.connection_status,
                "has_frame": status.has_frame,
            }),
        );
    }

    Json(json!({
        "status": "healthy",
        "timestamp": now.to_rfc3339(),
        "service": "parkwatch-server",
        "areas": areas,
    }))
}

/// Custom metrics catalog endpoint
pub async fn custom_metrics_info() -> impl IntoResponse {
    Json(json!({
        "available_metrics": DetectionMetrics::available_metrics(),
        "metrics_endpoint": "/metrics",
        "note": "Access /metrics endpoint for Prometheus scraping",
    }))
}
