//! Application configuration.
//!
//! Settings are loaded from an optional TOML file plus `SCANBENCH_*`
//! environment overrides, with serde defaults for every field so an empty
//! configuration is always valid.
//!
//! ```toml
//! captures_dir = "captures"
//!
//! [motion]
//! port = "/dev/ttyUSB0"
//! baud = 115200
//! feed_xy = 1000
//! feed_z = 100
//! settle = "1s"
//! ack_timeout = "5s"
//!
//! [motion.anchor]
//! x = 100.0
//! y = 100.0
//! z = 100.0
//!
//! [camera]
//! preview_width = 640
//! preview_height = 480
//! ```

use crate::error::BenchResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level settings for the capture bench.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub motion: MotionSettings,

    #[serde(default)]
    pub camera: CameraSettings,

    /// Directory that persisted captures land in.
    #[serde(default = "default_captures_dir")]
    pub captures_dir: PathBuf,
}

/// Motion-controller link settings.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MotionSettings {
    /// Serial port path, e.g. "/dev/ttyUSB0" or "COM3".
    #[serde(default = "default_port")]
    pub port: String,

    #[serde(default = "default_baud")]
    pub baud: u32,

    /// Feed rate for horizontal (XY) moves, in controller units/min.
    #[serde(default = "default_feed_xy")]
    pub feed_xy: u32,

    /// Feed rate for vertical (Z) moves.
    #[serde(default = "default_feed_z")]
    pub feed_z: u32,

    /// Delay between motion completion and capture.
    #[serde(default = "default_settle", with = "humantime_serde")]
    pub settle: Duration,

    /// Bound on the wait for a command acknowledgment.
    #[serde(default = "default_ack_timeout", with = "humantime_serde")]
    pub ack_timeout: Duration,

    /// Logical origin of the scan area, applied via set-origin.
    #[serde(default)]
    pub anchor: Anchor,
}

/// Stage coordinates treated as the logical center of the scan area.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Camera session settings.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CameraSettings {
    #[serde(default = "default_preview_width")]
    pub preview_width: u32,

    #[serde(default = "default_preview_height")]
    pub preview_height: u32,
}

fn default_captures_dir() -> PathBuf {
    PathBuf::from("captures")
}

fn default_port() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_baud() -> u32 {
    115_200
}

fn default_feed_xy() -> u32 {
    1000
}

fn default_feed_z() -> u32 {
    100
}

fn default_settle() -> Duration {
    Duration::from_secs(1)
}

fn default_ack_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_preview_width() -> u32 {
    640
}

fn default_preview_height() -> u32 {
    480
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            motion: MotionSettings::default(),
            camera: CameraSettings::default(),
            captures_dir: default_captures_dir(),
        }
    }
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud: default_baud(),
            feed_xy: default_feed_xy(),
            feed_z: default_feed_z(),
            settle: default_settle(),
            ack_timeout: default_ack_timeout(),
            anchor: Anchor::default(),
        }
    }
}

impl Default for Anchor {
    fn default() -> Self {
        Self {
            x: 100.0,
            y: 100.0,
            z: 100.0,
        }
    }
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            preview_width: default_preview_width(),
            preview_height: default_preview_height(),
        }
    }
}

impl Settings {
    /// Load settings from an optional TOML file and the environment.
    ///
    /// Environment variables use the `SCANBENCH_` prefix with `__` as the
    /// nesting separator, e.g. `SCANBENCH_MOTION__PORT=/dev/ttyACM0`.
    pub fn new(path: Option<&str>) -> BenchResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        let cfg = builder
            .add_source(
                config::Environment::with_prefix("SCANBENCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(cfg.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.motion.port, "/dev/ttyUSB0");
        assert_eq!(settings.motion.baud, 115_200);
        assert_eq!(settings.motion.feed_xy, 1000);
        assert_eq!(settings.motion.feed_z, 100);
        assert_eq!(settings.motion.settle, Duration::from_secs(1));
        assert_eq!(settings.camera.preview_width, 640);
        assert_eq!(settings.captures_dir, PathBuf::from("captures"));
    }

    #[test]
    fn test_new_without_file_uses_defaults() {
        let settings = Settings::new(None).unwrap();
        assert_eq!(settings.motion.anchor, Anchor::default());
        assert_eq!(settings.motion.ack_timeout, Duration::from_secs(5));
    }
}
