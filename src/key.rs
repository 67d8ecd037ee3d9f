//! Request path parsing for the `<width>x<height>/<master key>` convention.
//!
//! Every optimized variant lives in the optimized store under a key made of a
//! resolution segment followed by the key of its master asset:
//!
//! ```text
//! 1280x720/wind/surfing.jpg
//! ^^^^^^^^ ^^^^^^^^^^^^^^^^
//! resolution   master key
//! ```
//!
//! A request path without a leading resolution segment gets the configured
//! default resolution prepended, then is parsed exactly once more. The
//! resolution segment is kept verbatim (`0640x480` and `640x480` are different
//! cache keys), only its numeric value is used for resizing.
//!
//! ## Ambiguity
//!
//! A master key whose first directory looks like `<digits>x<digits>` cannot be
//! told apart from a resolution segment. `640x480/a.jpg` always means "a.jpg at
//! 640x480", never "the master called 640x480/a.jpg".

use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("malformed key: {0:?}")]
    Malformed(String),
    #[error("resolution {0} is not allowed")]
    Forbidden(String),
}

/// A requested output box, e.g. `1280x720`.
///
/// `segment` is the exact text that appeared in the path. Values too large for
/// a `u32` saturate; they still denote a box no image will exceed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
    segment: String,
}

impl Resolution {
    /// Parse a `<digits>x<digits>` segment. Both sides must be non-zero.
    pub fn parse(segment: &str) -> Option<Self> {
        let (w, h) = segment.split_once('x')?;
        let width = parse_dimension(w)?;
        let height = parse_dimension(h)?;
        Some(Self {
            width,
            height,
            segment: segment.to_string(),
        })
    }

    /// The canonical string form, used as the first key segment and as the
    /// allow-list lookup.
    pub fn as_str(&self) -> &str {
        &self.segment
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segment)
    }
}

fn parse_dimension(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match digits.parse::<u32>() {
        Ok(0) => None,
        Ok(n) => Some(n),
        // Only overflow is possible past the digit check
        Err(_) => Some(u32::MAX),
    }
}

/// A validated request: which master to read and where its variant lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalKey {
    pub resolution: Resolution,
    pub master_key: String,
    pub optimized_key: String,
}

impl CanonicalKey {
    pub fn new(resolution: Resolution, master_key: &str) -> Self {
        let optimized_key = format!("{}/{}", resolution, master_key);
        Self {
            resolution,
            master_key: master_key.to_string(),
            optimized_key,
        }
    }
}

/// Resolution policy. An empty set allows every resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedResolutions(HashSet<String>);

impl AllowedResolutions {
    /// Parse a comma-separated list such as `"1920x1080, 1280x720"`.
    ///
    /// Whitespace around entries is ignored and empty entries are dropped, so
    /// `""` yields the open policy.
    pub fn parse(list: &str) -> Self {
        Self(
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    pub fn is_open(&self) -> bool {
        self.0.is_empty()
    }

    pub fn permits(&self, resolution: &Resolution) -> bool {
        self.is_open() || self.0.contains(resolution.as_str())
    }
}

/// Split `<resolution>/<rest>` if the path starts with a resolution segment.
///
/// `rest` must be non-empty and must not itself start with a resolution
/// segment, so a master key never carries one.
fn match_key(path: &str) -> Option<CanonicalKey> {
    let (head, rest) = path.split_once('/')?;
    let resolution = Resolution::parse(head)?;
    if rest.is_empty() || starts_with_resolution(rest) {
        return None;
    }
    Some(CanonicalKey::new(resolution, rest))
}

fn starts_with_resolution(path: &str) -> bool {
    path.split_once('/')
        .is_some_and(|(head, _)| Resolution::parse(head).is_some())
}

/// Resolve a raw request path into a [`CanonicalKey`].
///
/// - `"600x400/wind.jpg"` → resolution `600x400`, master `wind.jpg`
/// - `"wind.jpg"` with default `"1280x720"` → resolution `1280x720`, master `wind.jpg`
/// - `""` → [`KeyError::Malformed`]
/// - `"600x400/wind.jpg"` with allow-list `{"1280x720"}` → [`KeyError::Forbidden`]
pub fn resolve(
    raw_path: &str,
    default_resolution: &str,
    allowed: &AllowedResolutions,
) -> Result<CanonicalKey, KeyError> {
    let key = match match_key(raw_path) {
        Some(key) => key,
        None => match_key(&format!("{}/{}", default_resolution, raw_path))
            .ok_or_else(|| KeyError::Malformed(raw_path.to_string()))?,
    };

    if !allowed.permits(&key.resolution) {
        return Err(KeyError::Forbidden(key.resolution.to_string()));
    }
    Ok(key)
}
