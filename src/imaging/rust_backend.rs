//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG) | `image::ImageReader` with format sniffing |
//! | Identify | `ImageReader::into_dimensions` (header only) |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` at the configured quality |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |
//! | Encode → WebP | `webp::Encoder` (lossy libwebp) at the configured quality |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{OutputFormat, ResizeParams};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn reader(source: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, BackendError> {
    ImageReader::new(Cursor::new(source))
        .with_guessed_format()
        .map_err(|e| BackendError::Decode(e.to_string()))
}

/// Load and decode an image from memory.
fn load_image(source: &[u8]) -> Result<DynamicImage, BackendError> {
    reader(source)?
        .decode()
        .map_err(|e| BackendError::Decode(e.to_string()))
}

/// Encode `img` in the requested format.
///
/// JPEG has no alpha channel and libwebp only takes 8-bit RGB(A), so the
/// pixel layout is normalised first.
fn encode(img: &DynamicImage, params: &ResizeParams) -> Result<Vec<u8>, BackendError> {
    let quality = params.quality.value();
    let mut buf = Vec::new();
    let result = match params.format {
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
        }
        OutputFormat::Png => img.write_with_encoder(PngEncoder::new(&mut buf)),
        OutputFormat::WebP => return encode_webp(img, quality),
    };
    result.map_err(|e| encode_error(params.format, e))?;
    Ok(buf)
}

/// Lossy WebP through libwebp.
fn encode_webp(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, BackendError> {
    let normalised = if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };
    let encoder = webp::Encoder::from_image(&normalised)
        .map_err(|e| encode_error(OutputFormat::WebP, e))?;
    let encoded = encoder
        .encode_simple(false, f32::from(quality))
        .map_err(|e| encode_error(OutputFormat::WebP, format!("{e:?}")))?;
    Ok(encoded.to_vec())
}

fn encode_error(format: OutputFormat, e: impl std::fmt::Display) -> BackendError {
    BackendError::Encode(format!("{}: {}", format.content_type(), e))
}

impl ImageBackend for RustBackend {
    fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = reader(source)?
            .into_dimensions()
            .map_err(|e| BackendError::Decode(format!("no dimensions: {e}")))?;
        Ok(Dimensions { width, height })
    }

    fn resize(&self, source: &[u8], params: &ResizeParams) -> Result<Vec<u8>, BackendError> {
        let img = load_image(source)?;
        let resized = if img.width() == params.width && img.height() == params.height {
            img
        } else {
            img.resize_exact(params.width, params.height, FilterType::Lanczos3)
        };
        encode(&resized, params)
    }
}
