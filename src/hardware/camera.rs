//! Camera capability interface.
//!
//! One `CameraDevice` wraps one physical camera. The device is owned
//! exclusively by its session for the process lifetime; nothing else touches
//! the hardware directly. Drivers live outside this crate — the traits here
//! are the seam they plug into.

use crate::broadcast::FrameBroadcast;
use crate::error::BenchResult;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Typed value for a named device control.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ControlValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ControlValue::Int(i) => Some(*i),
            ControlValue::Float(f) => Some(*f as i64),
            ControlValue::Text(s) => s.parse().ok(),
            ControlValue::Bool(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ControlValue::Float(f) => Some(*f),
            ControlValue::Int(i) => Some(*i as f64),
            ControlValue::Text(s) => s.parse().ok(),
            ControlValue::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ControlValue::Bool(b) => Some(*b),
            ControlValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ControlValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlValue::Bool(b) => write!(f, "{}", b),
            ControlValue::Int(i) => write!(f, "{}", i),
            ControlValue::Float(v) => write!(f, "{}", v),
            ControlValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for ControlValue {
    fn from(v: bool) -> Self {
        ControlValue::Bool(v)
    }
}

impl From<i64> for ControlValue {
    fn from(v: i64) -> Self {
        ControlValue::Int(v)
    }
}

impl From<f64> for ControlValue {
    fn from(v: f64) -> Self {
        ControlValue::Float(v)
    }
}

impl From<&str> for ControlValue {
    fn from(v: &str) -> Self {
        ControlValue::Text(v.to_string())
    }
}

impl From<String> for ControlValue {
    fn from(v: String) -> Self {
        ControlValue::Text(v)
    }
}

/// Device-reported identity, used for session labels.
#[derive(Clone, Debug, Default)]
pub struct CameraIdentity {
    /// Sensor/module model name, if the driver reports one.
    pub model: Option<String>,
}

/// Stream configuration profiles. Preview feeds the continuous encoder at
/// low resolution; Still is the full-resolution capture profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamProfile {
    Preview,
    Still,
}

/// Result of a still capture. Devices that cannot capture into memory hand
/// back a temporary file instead; the session reads it back and removes it.
#[derive(Debug)]
pub enum StillPayload {
    Bytes(Bytes),
    TempFile(PathBuf),
}

/// One physical camera.
///
/// All methods take `&mut self`: the owning session serializes access
/// through its own lock, so drivers never see concurrent calls.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    fn identity(&self) -> CameraIdentity;

    /// Apply a stream profile. Must be called with `Preview` before
    /// `start_preview` and with `Still` before `capture_still`.
    async fn configure(&mut self, profile: StreamProfile) -> BenchResult<()>;

    /// Start the continuous encode path, publishing each encoded frame to
    /// `sink`. Runs until `stop_preview`.
    async fn start_preview(&mut self, sink: FrameBroadcast) -> BenchResult<()>;

    /// Stop the continuous encode path. Safe to call when not running.
    async fn stop_preview(&mut self) -> BenchResult<()>;

    /// Capture a single frame under the currently configured profile.
    async fn capture_still(&mut self) -> BenchResult<StillPayload>;

    /// Apply already-translated device controls.
    async fn apply_controls(&mut self, controls: &[(String, ControlValue)]) -> BenchResult<()>;

    /// Snapshot of current sensor state (exposure, gains, ...).
    async fn read_metadata(&mut self) -> BenchResult<HashMap<String, ControlValue>>;

    /// Release the device handle. Called once at shutdown.
    async fn release(&mut self) -> BenchResult<()>;
}

/// Enumerates the cameras available at startup.
pub trait CameraProvider: Send + Sync {
    fn enumerate(&self) -> BenchResult<Vec<Box<dyn CameraDevice>>>;
}
