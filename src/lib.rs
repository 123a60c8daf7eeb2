//! Core library for the scanbench application.
//!
//! This library is the capture orchestration engine behind a motorized
//! imaging rig: camera sessions that stream live preview while serving
//! full-resolution stills, a command/acknowledgment link to the motion
//! controller, and the move-settle-capture macro that ties them together.
//! The HTTP routing layer and the hardware drivers live outside; they meet
//! this crate at [`app::ScanContext`] and the traits in [`hardware`].

pub mod app;
pub mod broadcast;
pub mod camera;
pub mod captures;
pub mod config;
pub mod error;
pub mod hardware;
pub mod motion;
pub mod scan;
pub mod stream;
pub mod transform;

/// Initialize the process-wide logger from `RUST_LOG`, defaulting to
/// `info`. Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
