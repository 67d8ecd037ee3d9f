//! Shared test utilities for the variant-cache test suite.
//!
//! Provides synthetic image fixtures and instrumented object stores:
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let master = RecordingStore::new(
//!     MemoryStore::new().with_object("a.jpg", jpeg_bytes(800, 600), "image/jpeg"),
//! );
//! // ... run a request ...
//! assert_eq!(master.gets(), 1);
//! ```

use crate::storage::{MemoryStore, ObjectStore, StorageError};
use image::{ImageEncoder, RgbImage, RgbaImage};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};

// =========================================================================
// Image fixtures
// =========================================================================

/// Encode a gradient JPEG of the given dimensions.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

/// Encode a gradient PNG with an alpha channel.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 64, 200])
    });
    let mut buf = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgba8)
        .unwrap();
    buf
}

/// Encode a PNG of smooth gradients overlaid with pixel noise.
///
/// Closer to photographic content than the flat gradients above, so lossy
/// encoders behave as they would on real masters.
pub fn noisy_png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut state: u32 = 0x2545_f491;
    let img = RgbImage::from_fn(width, height, |x, y| {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let noise = (state >> 27) as u8;
        let base = [(x * 255 / width) as u8, (y * 255 / height) as u8, 128];
        image::Rgb(base.map(|c| c.saturating_add(noise)))
    });
    let mut buf = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

// =========================================================================
// Instrumented stores
// =========================================================================

/// A [`MemoryStore`] that counts every call by kind.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    heads: AtomicUsize,
    gets: AtomicUsize,
    puts: AtomicUsize,
}

impl RecordingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn heads(&self) -> usize {
        self.heads.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.heads() + self.gets() + self.puts()
    }
}

impl ObjectStore for RecordingStore {
    fn head(&self, key: &str) -> Result<bool, StorageError> {
        self.heads.fetch_add(1, Ordering::SeqCst);
        self.inner.head(key)
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key)
    }

    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, bytes, content_type)
    }
}

/// A [`MemoryStore`] whose selected operations fail as an outage.
#[derive(Default)]
pub struct FailingStore {
    pub inner: MemoryStore,
    fail_head: bool,
    fail_get: bool,
    fail_put: bool,
}

impl FailingStore {
    pub fn always() -> Self {
        Self {
            fail_head: true,
            fail_get: true,
            fail_put: true,
            ..Self::default()
        }
    }

    pub fn head_only() -> Self {
        Self {
            fail_head: true,
            ..Self::default()
        }
    }

    pub fn put_only() -> Self {
        Self {
            fail_put: true,
            ..Self::default()
        }
    }

    fn outage(key: &str) -> StorageError {
        StorageError::Transient(io::Error::other(format!("injected failure for {key}")))
    }
}

impl ObjectStore for FailingStore {
    fn head(&self, key: &str) -> Result<bool, StorageError> {
        if self.fail_head {
            return Err(Self::outage(key));
        }
        self.inner.head(key)
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        if self.fail_get {
            return Err(Self::outage(key));
        }
        self.inner.get(key)
    }

    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError> {
        if self.fail_put {
            return Err(Self::outage(key));
        }
        self.inner.put(key, bytes, content_type)
    }
}
