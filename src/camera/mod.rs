//! Camera sessions, registry, and multi-camera capture.

pub mod controls;
pub mod multi;
pub mod registry;
pub mod session;

pub use multi::{capture_all, CaptureResult, MultiCaptureResults};
pub use registry::{CameraDescriptor, CameraRegistry};
pub use session::{CameraSession, SessionMode};
