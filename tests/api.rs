//! HTTP API tests with a mocked detection backend

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use image::{Rgb, RgbImage};
use std::sync::Arc;
use tower::ServiceExt;

use parkwatch::area_state::AreaId;
use parkwatch::detector::{Detector, ObjectDetection};
use parkwatch::web_api::create_router;
use parkwatch::{AppConfig, AppState};

struct MockDetector {
    detections: Vec<ObjectDetection>,
}

impl Detector for MockDetector {
    fn detect(&self, _image: &image::DynamicImage) -> parkwatch::Result<Vec<ObjectDetection>> {
        Ok(self.detections.clone())
    }
}

fn car(confidence: f32) -> ObjectDetection {
    ObjectDetection {
        class_name: "car".to_string(),
        confidence,
        bbox: [10, 20, 110, 220],
    }
}

fn test_state(detections: Vec<ObjectDetection>) -> AppState {
    let config = AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        model_path: "unused.onnx".into(),
        font_path: None,
    };
    AppState::new(config, Arc::new(MockDetector { detections })).unwrap()
}

fn sample_jpeg() -> Vec<u8> {
    let img = RgbImage::from_pixel(64, 48, Rgb([40, 80, 120]));
    let mut buf = Vec::new();
    img.write_with_encoder(image::codecs::jpeg::JpegEncoder::new(&mut buf))
        .unwrap();
    buf
}

async fn request(app: &Router, method: &str, uri: &str, body: Vec<u8>) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, body) = request(app, "GET", uri, Vec::new()).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn empty_upload_body_returns_400() {
    let app = create_router(test_state(vec![]));

    let (status, body) = request(&app, "POST", "/a1/upload", Vec::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "No image data provided");
}

#[tokio::test]
async fn upload_with_one_car_updates_state_and_gauge() {
    let state = test_state(vec![car(0.95)]);
    let app = create_router(state.clone());

    let (status, body) = request(&app, "POST", "/a1/upload", sample_jpeg()).await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "Image processed");
    assert_eq!(json["area"], "A1");
    assert_eq!(json["detections"].as_array().unwrap().len(), 1);

    assert_eq!(state.metrics.occupancy(AreaId::A1), 1);
    assert_eq!(state.metrics.detections_total(AreaId::A1), 1);
}

#[tokio::test]
async fn get_detections_applies_confidence_filter() {
    let app = create_router(test_state(vec![car(0.95), car(0.75), car(0.85)]));

    request(&app, "POST", "/a1/upload", sample_jpeg()).await;

    let (status, json) = get_json(&app, "/a1/get_detections").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["object_counts"]["car"], 2);
    assert_eq!(json["total_detections_in_frame"], 3);
    assert_eq!(json["high_confidence_detections"].as_array().unwrap().len(), 2);
    assert_eq!(json["confidence_threshold"], 0.8);
    assert_eq!(json["connection_status"], true);
    assert_eq!(json["area"], "A1");
}

#[tokio::test]
async fn get_detections_before_any_upload_reports_none() {
    let app = create_router(test_state(vec![]));

    let (status, json) = get_json(&app, "/a2/get_detections").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "No detections yet");
    assert_eq!(json["object_counts"]["car"], 0);
    assert_eq!(json["connection_status"], false);
}

#[tokio::test]
async fn non_car_detections_are_dropped() {
    let person = ObjectDetection {
        class_name: "person".to_string(),
        confidence: 0.99,
        bbox: [0, 0, 50, 50],
    };
    let app = create_router(test_state(vec![person, car(0.9)]));

    let (_, body) = request(&app, "POST", "/a1/upload", sample_jpeg()).await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    let detections = json["detections"].as_array().unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0]["class"], "car");
}

#[tokio::test]
async fn combined_total_is_sum_of_filtered_counts() {
    let app = create_router(test_state(vec![car(0.95), car(0.75)]));

    request(&app, "POST", "/a1/upload", sample_jpeg()).await;
    request(&app, "POST", "/a2/upload", sample_jpeg()).await;

    let (status, json) = get_json(&app, "/combined/get_detections").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["area_a1"]["car_count"], 1);
    assert_eq!(json["area_a2"]["car_count"], 1);
    assert_eq!(json["total_cars"], 2);
    assert_eq!(json["confidence_threshold"], 0.8);
}

#[tokio::test]
async fn fresh_area_status_is_disconnected() {
    let app = create_router(test_state(vec![]));

    let (status, json) = get_json(&app, "/a2/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["connection_status"], false);
    assert_eq!(json["has_frame"], false);
    assert_eq!(json["last_frame_time"], serde_json::Value::Null);
    assert_eq!(json["area"], "A2");
}

#[tokio::test]
async fn status_after_upload_is_connected() {
    let app = create_router(test_state(vec![car(0.9)]));

    request(&app, "POST", "/a1/upload", sample_jpeg()).await;

    let (_, json) = get_json(&app, "/a1/status").await;
    assert_eq!(json["connection_status"], true);
    assert_eq!(json["has_frame"], true);
    assert!(json["last_frame_time"].is_string());
}

#[tokio::test]
async fn combined_status_reports_both_areas() {
    let app = create_router(test_state(vec![]));

    request(&app, "POST", "/a1/upload", sample_jpeg()).await;

    let (status, json) = get_json(&app, "/combined/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["area_a1"]["connection_status"], true);
    assert_eq!(json["area_a1"]["has_frame"], true);
    assert_eq!(json["area_a2"]["connection_status"], false);
    assert_eq!(json["area_a2"]["has_frame"], false);
}

#[tokio::test]
async fn unknown_area_returns_404() {
    let app = create_router(test_state(vec![]));

    let (status, _) = request(&app, "GET", "/a9/status", Vec::new()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request(&app, "POST", "/a9/upload", sample_jpeg()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_per_area_state() {
    let app = create_router(test_state(vec![]));

    let (status, json) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "parkwatch-server");
    assert_eq!(json["areas"]["A1"]["connection_status"], false);
    assert_eq!(json["areas"]["A2"]["has_frame"], false);
}

#[tokio::test]
async fn metrics_exposition_includes_custom_metrics() {
    let app = create_router(test_state(vec![car(0.95)]));

    request(&app, "POST", "/a1/upload", sample_jpeg()).await;

    let (status, body) = request(&app, "GET", "/metrics", Vec::new()).await;
    assert_eq!(status, StatusCode::OK);

    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("parkwatch_occupied_slots_area_a1"));
    assert!(text.contains("parkwatch_car_detections_total"));
    assert!(text.contains("parkwatch_detection_confidence_score_histogram"));
}

#[tokio::test]
async fn http_request_metrics_track_endpoints() {
    let state = test_state(vec![]);
    let app = create_router(state.clone());

    get_json(&app, "/a1/status").await;
    get_json(&app, "/a1/status").await;
    request(&app, "POST", "/a2/upload", Vec::new()).await;

    assert_eq!(state.metrics.http_requests("/:area/status", "GET", 200), 2);
    assert_eq!(state.metrics.http_requests("/:area/upload", "POST", 400), 1);

    let (_, body) = request(&app, "GET", "/metrics", Vec::new()).await;
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("parkwatch_http_requests_total"));
    assert!(text.contains("parkwatch_http_request_duration_seconds"));
}

#[tokio::test]
async fn health_requests_are_not_tracked() {
    let state = test_state(vec![]);
    let app = create_router(state.clone());

    get_json(&app, "/health").await;
    get_json(&app, "/health").await;

    assert_eq!(state.metrics.http_requests("/health", "GET", 200), 0);
}

#[tokio::test]
async fn custom_metrics_lists_metric_names() {
    let app = create_router(test_state(vec![]));

    let (status, json) = get_json(&app, "/custom_metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["metrics_endpoint"], "/metrics");

    let names = json["available_metrics"].as_array().unwrap();
    assert_eq!(names.len(), 4);
}

#[tokio::test]
async fn undecodable_upload_returns_500() {
    let app = create_router(test_state(vec![]));

    let (status, body) = request(&app, "POST", "/a1/upload", b"not an image".to_vec()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("Processing failed"));
}
