//! The lookup → type check → fetch → transform → store → redirect protocol.
//!
//! ```text
//! Resolving ──reject──▶ Forbidden
//!     │
//!     ▼
//! CacheCheck ──hit──▶ RedirectToOptimized(AlreadyOptimized)
//!     │ miss
//!     ▼
//! TypeCheck ──not an image──▶ RedirectToOriginal(NotAnImage)
//!     │
//!     ▼
//! OriginFetch ─▶ Transform ─▶ Store ─▶ RedirectToOptimized(Optimized)
//!
//! any failure in OriginFetch / Transform / Store ─▶ RedirectToOriginal(Error)
//! ```
//!
//! Input is judged strictly: a malformed or disallowed key is a 403. Internal
//! failures are judged leniently: the caller is sent to the untouched master
//! and the cause is only logged. Every request does at most one store write
//! and nothing is retried. The type check only looks at the key, so masters
//! that are not resizable images are never read.
//!
//! Two concurrent misses for the same key both compute and both write the
//! variant; the stores' overwrite-safe `put` makes the duplicate harmless.

use crate::gateway::{CacheGateway, Links, OriginGateway};
use crate::imaging::{self, BackendError, ImageBackend, Quality};
use crate::key::{self, AllowedResolutions, CanonicalKey};
use crate::media::MediaDescriptor;
use crate::response::ResponseDescriptor;
use crate::storage::StorageError;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a request was sent to the optimized store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizedReason {
    /// The variant was already cached.
    AlreadyOptimized,
    /// The variant was computed and stored by this request.
    Optimized,
}

/// Why a request was sent to the master store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginalReason {
    NotAnImage,
    Error,
}

/// What a request reduces to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingOutcome {
    Forbidden,
    RedirectToOriginal {
        master_key: String,
        reason: OriginalReason,
    },
    RedirectToOptimized {
        optimized_key: String,
        reason: OptimizedReason,
    },
}

/// Internal cause of a fallback redirect. Logged, never shown to the caller.
#[derive(Error, Debug)]
pub enum FallbackCause {
    #[error("origin unavailable: {0}")]
    OriginUnavailable(#[source] StorageError),
    #[error("transform failed: {0}")]
    TransformFailure(#[source] BackendError),
    #[error("store failed: {0}")]
    StoreFailure(#[source] StorageError),
}

impl FallbackCause {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::OriginUnavailable(_) => "origin_unavailable",
            Self::TransformFailure(_) => "transform_failure",
            Self::StoreFailure(_) => "store_failure",
        }
    }
}

enum MissOutcome {
    Stored,
    NotAnImage,
}

/// Key policy applied before any store is touched.
#[derive(Debug, Clone, Default)]
pub struct KeyPolicy {
    pub default_resolution: String,
    pub allowed: AllowedResolutions,
}

impl KeyPolicy {
    pub fn resolve(&self, raw_path: &str) -> Result<CanonicalKey, key::KeyError> {
        key::resolve(raw_path, &self.default_resolution, &self.allowed)
    }
}

pub struct RequestCoordinator<B: ImageBackend> {
    policy: KeyPolicy,
    origin: OriginGateway,
    cache: CacheGateway,
    backend: B,
    quality: Quality,
    links: Links,
}

impl<B: ImageBackend> RequestCoordinator<B> {
    pub fn new(
        policy: KeyPolicy,
        origin: OriginGateway,
        cache: CacheGateway,
        backend: B,
        links: Links,
    ) -> Self {
        Self {
            policy,
            origin,
            cache,
            backend,
            quality: Quality::default(),
            links,
        }
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Run the protocol for one request.
    pub fn handle(&self, raw_path: &str, accept: Option<&str>) -> RoutingOutcome {
        let key = match self.policy.resolve(raw_path) {
            Ok(key) => key,
            Err(e) => {
                debug!(path = raw_path, error = %e, "rejected key");
                return RoutingOutcome::Forbidden;
            }
        };

        match self.cache.exists(&key.optimized_key) {
            Ok(true) => {
                debug!(optimized_key = %key.optimized_key, "cache hit");
                return RoutingOutcome::RedirectToOptimized {
                    optimized_key: key.optimized_key,
                    reason: OptimizedReason::AlreadyOptimized,
                };
            }
            Ok(false) => {}
            // An unanswerable presence check is a miss; the store step
            // overwrites whatever may be there.
            Err(e) => warn!(
                optimized_key = %key.optimized_key,
                error = %e,
                "existence check failed, treating as miss"
            ),
        }

        match self.compute(&key, accept) {
            Ok(MissOutcome::Stored) => {
                info!(optimized_key = %key.optimized_key, "variant stored");
                RoutingOutcome::RedirectToOptimized {
                    optimized_key: key.optimized_key,
                    reason: OptimizedReason::Optimized,
                }
            }
            Ok(MissOutcome::NotAnImage) => {
                debug!(master_key = %key.master_key, "not an image, passing through");
                RoutingOutcome::RedirectToOriginal {
                    master_key: key.master_key,
                    reason: OriginalReason::NotAnImage,
                }
            }
            Err(cause) => {
                warn!(
                    master_key = %key.master_key,
                    optimized_key = %key.optimized_key,
                    cause = cause.tag(),
                    error = %cause,
                    "falling back to original"
                );
                Self::fallback(key)
            }
        }
    }

    /// The miss path: type check, fetch, transform, store.
    fn compute(
        &self,
        key: &CanonicalKey,
        accept: Option<&str>,
    ) -> Result<MissOutcome, FallbackCause> {
        let media = MediaDescriptor::from_key(&key.master_key);
        let source_type = match media.content_type {
            Some(t) if media.is_supported_image() => t,
            _ => return Ok(MissOutcome::NotAnImage),
        };

        let master = self
            .origin
            .fetch(&key.master_key)
            .map_err(FallbackCause::OriginUnavailable)?;

        let variant = imaging::transform(
            &self.backend,
            &master,
            source_type,
            (key.resolution.width, key.resolution.height),
            accept,
            self.quality,
        )
        .map_err(FallbackCause::TransformFailure)?;

        self.cache
            .store(
                &key.optimized_key,
                &variant.bytes,
                variant.content_type(source_type),
            )
            .map_err(FallbackCause::StoreFailure)?;
        Ok(MissOutcome::Stored)
    }

    fn fallback(key: CanonicalKey) -> RoutingOutcome {
        RoutingOutcome::RedirectToOriginal {
            master_key: key.master_key,
            reason: OriginalReason::Error,
        }
    }

    /// The outcome for a request whose processing died without producing one.
    ///
    /// Resolves the key again so the caller still gets the master, or a 403
    /// if the key never resolved in the first place.
    pub fn fallback_for(&self, raw_path: &str) -> RoutingOutcome {
        match self.policy.resolve(raw_path) {
            Ok(key) => Self::fallback(key),
            Err(_) => RoutingOutcome::Forbidden,
        }
    }

    pub fn describe(&self, outcome: &RoutingOutcome) -> ResponseDescriptor {
        ResponseDescriptor::from_outcome(outcome, &self.links)
    }

    /// [`handle`](Self::handle) followed by [`describe`](Self::describe).
    pub fn respond(&self, raw_path: &str, accept: Option<&str>) -> ResponseDescriptor {
        self.describe(&self.handle(raw_path, accept))
    }
}
