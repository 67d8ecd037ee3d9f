//! The transcode policy.
//!
//! [`transform`] combines the fit calculation, the encoding negotiation and a
//! backend call: identify the master, fit it inside the requested box without
//! enlarging it, and re-encode either to WebP (when the client accepts it) or
//! to the master's own format.

use super::backend::{BackendError, ImageBackend};
use super::calculations::calculate_fit_dimensions;
use super::params::{OutputFormat, Quality, ResizeParams};
use crate::media;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Encoded variant ready to store.
///
/// `content_type_override` is `None` when the master's content type still
/// applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeResult {
    pub bytes: Vec<u8>,
    pub content_type_override: Option<&'static str>,
}

impl TranscodeResult {
    /// The content type to store the variant under.
    pub fn content_type<'a>(&self, source_type: &'a str) -> &'a str {
        self.content_type_override.unwrap_or(source_type)
    }
}

/// Whether an `Accept` header value admits WebP.
///
/// A plain substring test, as browsers list `image/webp` explicitly when they
/// support it. Wildcards like `image/*` do not count.
pub fn accepts_webp(accept: Option<&str>) -> bool {
    accept.is_some_and(|a| a.contains(media::WEBP))
}

/// Plan the resize without executing it.
pub fn plan_resize(
    source_dims: (u32, u32),
    bounds: (u32, u32),
    source_type: &str,
    accept: Option<&str>,
    quality: Quality,
) -> Result<ResizeParams> {
    let format = if accepts_webp(accept) {
        OutputFormat::WebP
    } else {
        OutputFormat::for_content_type(source_type)
            .ok_or_else(|| BackendError::UnsupportedSource(source_type.to_string()))?
    };
    let (width, height) = calculate_fit_dimensions(source_dims, bounds);
    Ok(ResizeParams {
        width,
        height,
        format,
        quality,
    })
}

/// Resize `source` to fit inside `bounds`, re-encoding per `accept`.
pub fn transform(
    backend: &impl ImageBackend,
    source: &[u8],
    source_type: &str,
    bounds: (u32, u32),
    accept: Option<&str>,
    quality: Quality,
) -> Result<TranscodeResult> {
    let dims = backend.identify(source)?;
    let params = plan_resize(
        (dims.width, dims.height),
        bounds,
        source_type,
        accept,
        quality,
    )?;
    let bytes = backend.resize(source, &params)?;
    let content_type_override = match params.format {
        OutputFormat::WebP => Some(media::WEBP),
        _ => None,
    };
    Ok(TranscodeResult {
        bytes,
        content_type_override,
    })
}
