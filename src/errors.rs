//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`ProgressiveError`] covers the internal failure
//! modes of variant loading:
//! - I/O and HTTP transport errors
//! - Container (glTF) parsing errors
//! - Image decoding errors
//! - Load queue shutdown
//!
//! Note that the *resolver surface* never propagates these to callers:
//! failures are caught at the resolver boundary, logged, and memoized as a
//! `None` result (the display falls back to the last-known-good resource).
//! The typed errors below exist for the fetch/parse layers underneath.

use thiserror::Error;

/// The main error type for progressive asset loading.
#[derive(Error, Debug)]
pub enum ProgressiveError {
    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // HTTP & Network Errors
    // ========================================================================
    /// HTTP request error.
    #[cfg(all(feature = "http", not(target_arch = "wasm32")))]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error.
    #[cfg(feature = "http")]
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// HTTP response error with status code.
    #[error("HTTP response error: status {status}")]
    HttpResponse {
        /// HTTP status code
        status: u16,
    },

    // ========================================================================
    // Format & Parsing Errors
    // ========================================================================
    /// glTF container parsing or loading error.
    #[error("glTF error: {0}")]
    Gltf(String),

    /// The container held no entry matching the requested descriptor id.
    #[error("no entry with descriptor id {0} in container")]
    DescriptorNotInContainer(String),

    /// A buffer referenced by the container could not be resolved.
    #[error("unresolved container buffer: {0}")]
    UnresolvedBuffer(String),

    /// Image decoding error.
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    /// Data URI parsing error.
    #[error("Data URI error: {0}")]
    DataUri(String),

    /// Base64 decoding error.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // Scheduling Errors
    // ========================================================================
    /// The load queue was closed while a request was waiting for admission.
    #[error("load queue closed")]
    QueueClosed,

    /// The background loader worker has shut down.
    #[error("loader worker disconnected")]
    WorkerDisconnected,
}

impl From<gltf::Error> for ProgressiveError {
    fn from(err: gltf::Error) -> Self {
        ProgressiveError::Gltf(err.to_string())
    }
}

impl From<image::ImageError> for ProgressiveError {
    fn from(err: image::ImageError) -> Self {
        ProgressiveError::ImageDecode(err.to_string())
    }
}

/// Alias for `Result<T, ProgressiveError>`.
pub type Result<T> = std::result::Result<T, ProgressiveError>;
