//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the dimensions of `source` scaled to fit inside `bounds`.
///
/// Aspect ratio is preserved, nothing is cropped or padded, and the image is
/// never enlarged: a source already inside the box keeps its dimensions.
/// Each side is rounded to the nearest pixel and never drops below 1.
///
/// # Examples
/// ```
/// # use variant_cache::imaging::calculate_fit_dimensions;
/// // 4000x3000 into a 1280x720 box → height-limited
/// let out = calculate_fit_dimensions((4000, 3000), (1280, 720));
/// assert_eq!(out, (960, 720));
///
/// // Already small enough → unchanged
/// let out = calculate_fit_dimensions((300, 200), (1280, 720));
/// assert_eq!(out, (300, 200));
/// ```
pub fn calculate_fit_dimensions(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;

    if src_w == 0 || src_h == 0 || (src_w <= max_w && src_h <= max_h) {
        return source;
    }

    let scale = f64::min(max_w as f64 / src_w as f64, max_h as f64 / src_h as f64);
    let w = ((src_w as f64 * scale).round() as u32).clamp(1, max_w);
    let h = ((src_h as f64 * scale).round() as u32).clamp(1, max_h);
    (w, h)
}
