//! Media type inference from master key extensions.
//!
//! The inference table knows more types than the transcoder accepts: GIF is
//! recognized but not in [`SUPPORTED_IMAGE_TYPES`], so GIF masters are always
//! passed through untouched.

/// Extension (lowercase) → MIME type.
const EXTENSION_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
];

/// Media types the transcoder will resize.
pub const SUPPORTED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png"];

pub const WEBP: &str = "image/webp";

/// The media type inferred for a master key. `None` means unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaDescriptor {
    pub content_type: Option<&'static str>,
}

impl MediaDescriptor {
    /// Infer from the text after the last `.` of the key, case-insensitively.
    ///
    /// A key without a dot is looked up as a whole, mirroring "last segment
    /// after splitting on `.`": `"png"` is a PNG, `"README"` is unknown.
    pub fn from_key(key: &str) -> Self {
        let ext = key.rsplit('.').next().unwrap_or(key).to_ascii_lowercase();
        let content_type = EXTENSION_TYPES
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, mime)| *mime);
        Self { content_type }
    }

    /// Whether the transcoder accepts this type. Unknown types are not images.
    pub fn is_supported_image(&self) -> bool {
        self.content_type
            .is_some_and(|t| SUPPORTED_IMAGE_TYPES.contains(&t))
    }
}
