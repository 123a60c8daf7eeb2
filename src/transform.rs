//! Still-image transform pipeline.
//!
//! Pure JPEG-to-JPEG transform: decode once, optionally crop from the image
//! center, optionally mirror vertically, re-encode at the requested quality.
//! Stateless and safe to call from any number of tasks concurrently.

use crate::error::BenchResult;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Whether to return the full frame or a center-anchored crop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformMode {
    Full,
    Crop,
}

/// Parameters for one transform invocation. Pure value, no identity.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TransformRequest {
    pub mode: TransformMode,
    /// Crop rectangle size in pixels.
    pub crop_width: u32,
    pub crop_height: u32,
    /// Crop rectangle offset relative to the image center.
    pub offset_x: i32,
    pub offset_y: i32,
    /// Mirror vertically after cropping.
    pub flip: bool,
    /// JPEG quality, clamped to 1..=100 at encode time.
    pub quality: u8,
}

impl Default for TransformRequest {
    fn default() -> Self {
        Self {
            mode: TransformMode::Crop,
            crop_width: 1400,
            crop_height: 1400,
            offset_x: 0,
            offset_y: 200,
            flip: true,
            quality: 85,
        }
    }
}

impl TransformRequest {
    /// A request that passes the image through geometrically unchanged.
    pub fn full(quality: u8) -> Self {
        Self {
            mode: TransformMode::Full,
            flip: false,
            quality,
            ..Self::default()
        }
    }
}

/// Apply `request` to a JPEG byte buffer, producing a new JPEG.
pub fn transform(jpeg: &[u8], request: &TransformRequest) -> BenchResult<Vec<u8>> {
    let img = image::load_from_memory_with_format(jpeg, ImageFormat::Jpeg)?;

    let out = match request.mode {
        TransformMode::Full => img,
        TransformMode::Crop => crop_from_center(
            &img,
            request.crop_width,
            request.crop_height,
            request.offset_x,
            request.offset_y,
        ),
    };

    let out = if request.flip { out.flipv() } else { out };

    let quality = request.quality.clamp(1, 100);
    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    out.write_with_encoder(encoder)?;
    Ok(buf.into_inner())
}

/// Crop a rectangle anchored at the image center plus an offset, clamped to
/// the image bounds. A clamp that collapses the rectangle to nothing returns
/// the original image unchanged rather than failing.
fn crop_from_center(
    img: &DynamicImage,
    crop_width: u32,
    crop_height: u32,
    offset_x: i32,
    offset_y: i32,
) -> DynamicImage {
    let (w, h) = img.dimensions();
    let cx = i64::from(w) / 2;
    let cy = i64::from(h) / 2;

    let left = cx - i64::from(crop_width) / 2 + i64::from(offset_x);
    let top = cy - i64::from(crop_height) / 2 + i64::from(offset_y);
    let right = left + i64::from(crop_width);
    let bottom = top + i64::from(crop_height);

    let left = left.clamp(0, i64::from(w));
    let top = top.clamp(0, i64::from(h));
    let right = right.clamp(0, i64::from(w));
    let bottom = bottom.clamp(0, i64::from(h));

    if right <= left || bottom <= top {
        return img.clone();
    }

    img.crop_imm(
        left as u32,
        top as u32,
        (right - left) as u32,
        (bottom - top) as u32,
    )
}
