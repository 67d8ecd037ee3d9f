//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the transcoder needs:
//! identify and resize. Both work on in-memory buffers since masters arrive as
//! object bytes, not files.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::params::ResizeParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Unsupported source type: {0}")]
    UnsupportedSource(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Send + Sync` so a single backend can serve every request task.
pub trait ImageBackend: Send + Sync {
    /// Read image dimensions without a full decode where possible.
    fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError>;

    /// Decode `source`, resample to exactly `params.width × params.height`
    /// (skipped when already that size) and encode as `params.format`.
    fn resize(&self, source: &[u8], params: &ResizeParams) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::params::{OutputFormat, Quality};
    use std::sync::Mutex;

    /// Mock backend that records operations without executing them.
    #[derive(Default)]
    pub struct MockBackend {
        pub dimensions: Mutex<Option<Dimensions>>,
        pub fail_resize: bool,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(usize),
        Resize {
            source_len: usize,
            width: u32,
            height: u32,
            format: OutputFormat,
            quality: u8,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dimensions(width: u32, height: u32) -> Self {
            Self {
                dimensions: Mutex::new(Some(Dimensions { width, height })),
                ..Self::default()
            }
        }

        pub fn failing(width: u32, height: u32) -> Self {
            Self {
                fail_resize: true,
                ..Self::with_dimensions(width, height)
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(source.len()));

            (*self.dimensions.lock().unwrap())
                .ok_or_else(|| BackendError::Decode("No mock dimensions".to_string()))
        }

        fn resize(&self, source: &[u8], params: &ResizeParams) -> Result<Vec<u8>, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Resize {
                source_len: source.len(),
                width: params.width,
                height: params.height,
                format: params.format,
                quality: params.quality.value(),
            });
            if self.fail_resize {
                return Err(BackendError::Encode("mock failure".to_string()));
            }
            Ok(format!(
                "{}x{}:{}",
                params.width,
                params.height,
                params.format.content_type()
            )
            .into_bytes())
        }
    }

    #[test]
    fn mock_records_identify() {
        let backend = MockBackend::with_dimensions(800, 600);

        let result = backend.identify(b"abcd").unwrap();
        assert_eq!(result.width, 800);
        assert_eq!(result.height, 600);

        let ops = backend.get_operations();
        assert_eq!(ops, vec![RecordedOp::Identify(4)]);
    }

    #[test]
    fn mock_identify_without_dimensions_errors() {
        let backend = MockBackend::new();
        assert!(backend.identify(b"x").is_err());
    }

    #[test]
    fn mock_records_resize() {
        let backend = MockBackend::new();

        let out = backend
            .resize(
                b"source",
                &ResizeParams {
                    width: 800,
                    height: 600,
                    format: OutputFormat::WebP,
                    quality: Quality::new(90),
                },
            )
            .unwrap();

        assert_eq!(out, b"800x600:image/webp");
        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            &ops[0],
            RecordedOp::Resize {
                width: 800,
                height: 600,
                format: OutputFormat::WebP,
                quality: 90,
                ..
            }
        ));
    }
}
