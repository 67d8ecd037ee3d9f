//! # Variant Cache
//!
//! Serves resized variants of master images on demand. A request names a
//! variant by key (`1280x720/wind/surfing.jpg`); the answer is always a
//! redirect or a 403, never the image bytes themselves.
//!
//! # Request Flow
//!
//! ```text
//! key ─▶ resolve ─▶ optimized store has it? ──yes──▶ 301 optimized URL
//!                          │ no
//!                          ▼
//!                   read master ─▶ image? ──no──▶ 301 master URL
//!                          │ yes
//!                          ▼
//!                   fit inside resolution ─▶ write variant ─▶ 301 optimized URL
//! ```
//!
//! The optimized store is the cache: once a variant is written, every later
//! request for it is a single existence check.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`key`] | Key grammar, resolution parsing, allow-list policy |
//! | [`media`] | Content type inference from the key's extension |
//! | [`imaging`] | Fit-inside resizing and encoding negotiation behind [`imaging::ImageBackend`] |
//! | [`storage`] | Object store trait with filesystem and in-memory stores |
//! | [`gateway`] | Master reads, variant writes, public URL building |
//! | [`coordinator`] | The per-request state machine |
//! | [`response`] | Outcome → status, `location`, body |
//! | [`server`] | axum routes, blocking-pool dispatch, graceful shutdown |
//! | [`config`] | `config.toml` + environment loading and validation |
//!
//! # Design Decisions
//!
//! ## Strict on Input, Lenient on Failure
//!
//! A malformed key or a resolution outside the allow-list is a 403. Anything
//! that fails after the key is accepted (missing master, undecodable image,
//! failed write) redirects to the master object, so a client always gets a
//! usable image.
//!
//! ## No Upscaling
//!
//! Variants fit inside the requested box and keep the aspect ratio. A master
//! smaller than the box is re-encoded at its own size.
//!
//! ## Synchronous Core
//!
//! Stores and the image backend are plain synchronous traits. The HTTP layer
//! runs each request on tokio's blocking pool, which keeps the state machine
//! testable without a runtime.

pub mod config;
pub mod coordinator;
pub mod gateway;
pub mod imaging;
pub mod key;
pub mod media;
pub mod response;
pub mod server;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_helpers;
