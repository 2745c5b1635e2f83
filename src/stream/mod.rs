//! MJPEG Streaming
//!
//! ## Responsibilities
//!
//! - multipart/x-mixed-replace responses for the live feeds
//! - Fixed-interval polling of the latest frame per area
//!
//! Each open feed owns its polling loop for the life of the connection;
//! the loop ends when the client disconnects and the body is dropped.
//! The disconnected placeholder is rendered once per feed, on the blocking
//! pool, and reused on every tick that has no stored frame.

use axum::body::Body;
use axum::http::header;
use axum::response::Response;
use bytes::{BufMut, Bytes, BytesMut};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use crate::area_state::AreaId;
use crate::error::{Error, Result};
use crate::state::AppState;

/// Which frame buffer a feed serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    /// Detection boxes drawn
    Annotated,
    /// Unmodified upload bytes
    Raw,
}

impl FeedKind {
    /// Poll interval between emitted frames
    pub fn interval(&self) -> Duration {
        match self {
            FeedKind::Annotated => Duration::from_millis(60),
            FeedKind::Raw => Duration::from_millis(100),
        }
    }
}

/// One multipart chunk wrapping a JPEG frame
pub(crate) fn multipart_chunk(frame: &[u8]) -> Bytes {
    let mut chunk = BytesMut::with_capacity(frame.len() + 64);
    chunk.put_slice(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n");
    chunk.put_slice(frame);
    chunk.put_slice(b"\r\n");
    chunk.freeze()
}

/// Infinite multipart stream of the latest frame for an area, falling back
/// to the disconnected placeholder while no frame exists
pub async fn mjpeg_response(state: AppState, area: AreaId, kind: FeedKind) -> Result<Response> {
    let area_state = state.store.get(area);
    let interval = kind.interval();

    let annotator = Arc::clone(&state.annotator);
    let placeholder = tokio::task::spawn_blocking(move || annotator.placeholder(area))
        .await
        .map_err(|e| Error::Internal(format!("Placeholder task failed: {e}")))??;
    let placeholder = multipart_chunk(&placeholder);

    let stream = async_stream::stream! {
        loop {
            let frame = match kind {
                FeedKind::Annotated => area_state.annotated_frame().await,
                FeedKind::Raw => area_state.raw_frame().await,
            };

            let chunk = match frame {
                Some(frame) => multipart_chunk(&frame),
                None => placeholder.clone(),
            };

            yield Ok::<Bytes, Infallible>(chunk);
            tokio::time::sleep(interval).await;
        }
    };

    Response::builder()
        .header(
            header::CONTENT_TYPE,
            "multipart/x-mixed-replace; boundary=frame",
        )
        .header(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")
        .body(Body::from_stream(stream))
        .map_err(|e| Error::Internal(format!("Stream response build failed: {e}")))
}
