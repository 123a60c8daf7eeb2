//! Custom error types for the application.
//!
//! This module defines the primary error type, `BenchError`, for the entire
//! crate. Using the `thiserror` crate, it provides a centralized and
//! consistent way to classify failures, from I/O and configuration issues to
//! device-specific problems.
//!
//! ## Error Hierarchy
//!
//! - **`Config`** / **`Io`** / **`Image`**: wrapped sources, converted via
//!   `#[from]` so `?` works at every call site.
//! - **`CameraNotFound`**: lookup of an unknown session id.
//! - **`DeviceUnavailable`**: camera enumeration or open failure at startup.
//! - **`CaptureFailed`**: a still capture failed mid-flight. The owning
//!   session is guaranteed to be restored to streaming before this surfaces.
//! - **`ControlRejected`**: a caller-supplied camera control could not be
//!   translated or applied.
//! - **`LinkDisconnected`** / **`AckTimeout`**: motion-link protocol
//!   failures. A timed-out command is never retried automatically.
//! - **`PartialCapture`**: a multi-camera batch where some but not all
//!   sessions failed.
//! - **`ShutdownFailed`**: aggregate of per-session shutdown errors; one
//!   session failing to stop never prevents the others from being attempted.

use std::time::Duration;
use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type BenchResult<T> = std::result::Result<T, BenchError>;

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Camera '{0}' not found")]
    CameraNotFound(String),

    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    #[error("Control rejected: {0}")]
    ControlRejected(String),

    #[error("Motion link is not connected")]
    LinkDisconnected,

    #[error("No acknowledgment within {0:?}")]
    AckTimeout(Duration),

    #[error("Capture failed on {}/{attempted} cameras", .failed.len())]
    PartialCapture {
        attempted: usize,
        failed: Vec<String>,
    },

    #[error("Frame stream closed")]
    StreamClosed,

    #[error("Shutdown failed with errors")]
    ShutdownFailed(Vec<BenchError>),
}
