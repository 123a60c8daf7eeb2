//! Hardware capability interfaces.
//!
//! The physical camera stack and the motion controller transport are
//! external collaborators. This module defines the narrow async traits the
//! rest of the crate consumes, plus mock implementations for tests and a
//! serial transport for real controllers.

pub mod camera;
pub mod mock;
#[cfg(feature = "motion_serial")]
pub mod serial;
pub mod transport;

pub use camera::{
    CameraDevice, CameraIdentity, CameraProvider, ControlValue, StillPayload, StreamProfile,
};
pub use transport::MotionTransport;
