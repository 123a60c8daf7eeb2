//! Move, settle, capture.
//!
//! The macro operation behind automated multi-position scanning: drive the
//! stage to a target, optionally retune the cameras, wait out mechanical
//! settling, then capture — one camera or a synchronized batch — and run the
//! result through the transform pipeline. A motion failure aborts before any
//! camera is touched.

use crate::camera::multi::{self, CaptureResult};
use crate::camera::registry::CameraRegistry;
use crate::captures;
use crate::error::{BenchError, BenchResult};
use crate::hardware::camera::ControlValue;
use crate::motion::gcode::MoveTarget;
use crate::motion::MotionLink;
use crate::transform::{transform, TransformRequest};
use bytes::Bytes;
use log::{info, warn};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Where the captured payloads go.
#[derive(Clone, Debug)]
pub struct OutputSpec {
    /// Persist transformed captures under this directory.
    pub save_dir: Option<PathBuf>,
    /// Carry the transformed bytes in the outcome. (Encoding them for the
    /// wire — base64 or otherwise — is the HTTP layer's business.)
    pub inline: bool,
}

impl Default for OutputSpec {
    fn default() -> Self {
        Self {
            save_dir: None,
            inline: true,
        }
    }
}

/// One scan step.
#[derive(Debug, Default)]
pub struct ScanRequest {
    pub target: MoveTarget,
    /// Controls applied to every target camera after the move.
    pub controls: Option<HashMap<String, ControlValue>>,
    /// Target sessions; empty means every registered camera.
    pub cameras: Vec<String>,
    pub transform: TransformRequest,
    /// Overrides the orchestrator's default settle delay.
    pub settle: Option<Duration>,
    pub output: OutputSpec,
}

/// One camera's transformed capture.
#[derive(Debug)]
pub struct CaptureArtifact {
    pub camera_id: String,
    pub label: String,
    pub bytes: Option<Bytes>,
    pub file: Option<PathBuf>,
}

/// Result of one scan step. `failures` is non-empty only for a partial
/// multi-camera outcome.
#[derive(Debug)]
pub struct ScanOutcome {
    pub artifacts: Vec<CaptureArtifact>,
    pub failures: Vec<(String, String)>,
}

/// Composes the motion link, the camera registry, and the transform
/// pipeline into the move-settle-capture macro.
#[derive(Clone)]
pub struct ScanOrchestrator {
    link: Arc<MotionLink>,
    registry: Arc<CameraRegistry>,
    default_settle: Duration,
}

impl ScanOrchestrator {
    pub fn new(
        link: Arc<MotionLink>,
        registry: Arc<CameraRegistry>,
        default_settle: Duration,
    ) -> Self {
        Self {
            link,
            registry,
            default_settle,
        }
    }

    /// Run one scan step.
    ///
    /// Phases: move (abort on failure, before any camera operation) →
    /// apply controls → settle → capture → transform → persist/inline.
    pub async fn move_and_capture(&self, request: &ScanRequest) -> BenchResult<ScanOutcome> {
        self.link.move_to(&request.target).await?;

        let ids = if request.cameras.is_empty() {
            self.registry.ids()
        } else {
            request.cameras.clone()
        };
        if ids.is_empty() {
            return Err(BenchError::CaptureFailed("no cameras registered".into()));
        }

        if let Some(controls) = &request.controls {
            for id in &ids {
                let session = self.registry.get(id)?;
                session.set_controls(controls).await?;
            }
        }

        let settle = request.settle.unwrap_or(self.default_settle);
        if settle > Duration::ZERO {
            info!("Settling {:?} before capture", settle);
            tokio::time::sleep(settle).await;
        }

        let (captures, failures) = self.capture_phase(&ids).await?;
        self.deliver(captures, failures, request).await
    }

    /// Capture from all target sessions, separating successes from
    /// per-camera failures. A single-camera failure propagates directly;
    /// a batch where every camera failed is a `CaptureFailed`.
    async fn capture_phase(
        &self,
        ids: &[String],
    ) -> BenchResult<(Vec<CaptureResult>, Vec<(String, String)>)> {
        if let [id] = ids {
            let session = self.registry.get(id)?;
            let bytes = session.capture_still().await?;
            return Ok((
                vec![CaptureResult {
                    camera_id: id.clone(),
                    label: session.label().to_string(),
                    bytes,
                    file: None,
                }],
                Vec::new(),
            ));
        }

        let mut results = multi::capture_all(&self.registry, ids, None).await;
        if let Some(err @ BenchError::CaptureFailed(_)) = multi::batch_error(&results) {
            return Err(err);
        }

        let mut captures = Vec::new();
        let mut failures = Vec::new();
        for id in ids {
            match results.remove(id) {
                Some(Ok(capture)) => captures.push(capture),
                Some(Err(e)) => {
                    warn!("capture failed on '{}': {}", id, e);
                    failures.push((id.clone(), e.to_string()));
                }
                None => {}
            }
        }
        Ok((captures, failures))
    }

    /// Transform every capture and persist/inline it per the output spec.
    async fn deliver(
        &self,
        captures: Vec<CaptureResult>,
        failures: Vec<(String, String)>,
        request: &ScanRequest,
    ) -> BenchResult<ScanOutcome> {
        let batch_time = chrono::Local::now();
        let mut artifacts = Vec::with_capacity(captures.len());

        for capture in captures {
            let payload = Bytes::from(transform(&capture.bytes, &request.transform)?);

            let file = match &request.output.save_dir {
                Some(dir) => {
                    tokio::fs::create_dir_all(dir).await?;
                    let path = dir.join(captures::capture_filename(&capture.label, batch_time));
                    tokio::fs::write(&path, &payload).await?;
                    Some(path)
                }
                None => None,
            };

            artifacts.push(CaptureArtifact {
                camera_id: capture.camera_id,
                label: capture.label,
                bytes: request.output.inline.then(|| payload.clone()),
                file,
            });
        }

        info!(
            "Scan step complete: {} artifact(s), {} failure(s)",
            artifacts.len(),
            failures.len()
        );
        Ok(ScanOutcome {
            artifacts,
            failures,
        })
    }
}
