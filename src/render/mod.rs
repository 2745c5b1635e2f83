//! Frame Rendering
//!
//! ## Responsibilities
//!
//! - Draw detection boxes and labels onto uploaded frames
//! - Generate the disconnected-camera placeholder
//! - JPEG encoding for stored and streamed frames

use ab_glyph::{FontVec, PxScale};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::PathBuf;

use crate::area_state::AreaId;
use crate::error::{Error, Result};
use crate::models::Detection;

const PLACEHOLDER_WIDTH: u32 = 640;
const PLACEHOLDER_HEIGHT: u32 = 480;
const JPEG_QUALITY: u8 = 85;

const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const AREA_LABEL_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const CAR_LABEL_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const PLACEHOLDER_BG: Rgb<u8> = Rgb([128, 128, 128]);
const PLACEHOLDER_TEXT: Rgb<u8> = Rgb([255, 255, 255]);

/// Draws detection annotations. Text rendering is skipped when no usable
/// font can be loaded; boxes are always drawn.
pub struct Annotator {
    font: Option<FontVec>,
}

impl Annotator {
    /// Load the label font from `font_path`, falling back to a well-known
    /// system location.
    pub fn new(font_path: Option<PathBuf>) -> Self {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(path) = font_path {
            candidates.push(path);
        }
        candidates.push(PathBuf::from(
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        ));

        let font = candidates.iter().find_map(|path| {
            let data = std::fs::read(path).ok()?;
            let font = FontVec::try_from_vec(data).ok()?;
            tracing::debug!(path = %path.display(), "Label font loaded");
            Some(font)
        });

        if font.is_none() {
            tracing::warn!("No label font found, annotations will omit text");
        }

        Self { font }
    }

    /// Draw boxes and labels for the given detections over a copy of `image`
    pub fn annotate(
        &self,
        image: &DynamicImage,
        area: AreaId,
        detections: &[Detection],
    ) -> RgbImage {
        let mut canvas = image.to_rgb8();

        for detection in detections {
            let [x1, y1, x2, y2] = detection.bounding_box;
            let width = (x2 - x1).max(1) as u32;
            let height = (y2 - y1).max(1) as u32;

            // Three nested rectangles give a 3px outline
            for inset in 0..3i32 {
                let w = width.saturating_sub(inset as u32 * 2).max(1);
                let h = height.saturating_sub(inset as u32 * 2).max(1);
                let rect = Rect::at(x1 + inset, y1 + inset).of_size(w, h);
                draw_hollow_rect_mut(&mut canvas, rect, BOX_COLOR);
            }

            if let Some(font) = &self.font {
                let scale = PxScale::from(24.0);
                let area_label = format!("Area {area}");
                let car_label = format!("Car: {:.2}", detection.confidence);
                draw_text_mut(
                    &mut canvas,
                    AREA_LABEL_COLOR,
                    x1,
                    (y1 - 30).max(0),
                    scale,
                    font,
                    &area_label,
                );
                draw_text_mut(
                    &mut canvas,
                    CAR_LABEL_COLOR,
                    x1,
                    (y1 - 10).max(0),
                    scale,
                    font,
                    &car_label,
                );
            }
        }

        canvas
    }

    /// Gray placeholder frame shown while an area has no camera feed
    pub fn placeholder(&self, area: AreaId) -> Result<Vec<u8>> {
        let mut canvas =
            RgbImage::from_pixel(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT, PLACEHOLDER_BG);

        if let Some(font) = &self.font {
            let text = format!("Area {area} - Camera Disconnected");
            let scale = PxScale::from(20.0);
            let (text_w, text_h) = text_size(scale, font, &text);
            let x = PLACEHOLDER_WIDTH.saturating_sub(text_w) as i32 / 2;
            let y = PLACEHOLDER_HEIGHT.saturating_sub(text_h) as i32 / 2;
            draw_text_mut(&mut canvas, PLACEHOLDER_TEXT, x, y, scale, font, &text);
        }

        encode_jpeg(&canvas)
    }
}

/// Encode an RGB image as JPEG at the storage quality
pub fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    image
        .write_with_encoder(encoder)
        .map_err(|e| Error::Encode(e.to_string()))?;
    Ok(buf)
}
