//! Synchronized multi-camera capture.
//!
//! Fans a still capture out to several sessions at once so the captures
//! represent (as nearly as possible) the same instant; the skew is bounded
//! by the slowest device, not the sum. One session failing never blocks
//! collection of the others' results.

use crate::camera::registry::CameraRegistry;
use crate::camera::session::CameraSession;
use crate::captures;
use crate::error::{BenchError, BenchResult};
use bytes::Bytes;
use chrono::{DateTime, Local};
use futures::future::join_all;
use log::info;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outcome of one camera's capture within a batch.
#[derive(Debug)]
pub struct CaptureResult {
    pub camera_id: String,
    pub label: String,
    pub bytes: Bytes,
    /// Set when the batch persisted captures to disk.
    pub file: Option<PathBuf>,
}

/// Per-id outcomes; failed sessions carry their own error.
pub type MultiCaptureResults = HashMap<String, BenchResult<CaptureResult>>;

/// Capture stills from all named sessions concurrently.
///
/// Unknown ids produce per-id `CameraNotFound` entries instead of failing
/// the batch. When `save_dir` is set, every file in the batch shares one
/// timestamp so the set correlates on disk.
pub async fn capture_all(
    registry: &CameraRegistry,
    ids: &[String],
    save_dir: Option<&Path>,
) -> MultiCaptureResults {
    let batch_time = Local::now();
    let mut results = MultiCaptureResults::new();
    let mut pending = Vec::new();

    for id in ids {
        match registry.get(id) {
            Ok(session) => {
                let dir = save_dir.map(Path::to_path_buf);
                let handle =
                    tokio::spawn(
                        async move { capture_one(&session, dir.as_deref(), batch_time).await },
                    );
                pending.push((id.clone(), handle));
            }
            Err(e) => {
                results.insert(id.clone(), Err(e));
            }
        }
    }

    let (ids, handles): (Vec<_>, Vec<_>) = pending.into_iter().unzip();
    for (id, joined) in ids.into_iter().zip(join_all(handles).await) {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => Err(BenchError::CaptureFailed(format!(
                "capture task for '{}' aborted: {}",
                id, e
            ))),
        };
        results.insert(id, outcome);
    }

    info!(
        "Batch capture finished: {}/{} succeeded",
        results.values().filter(|r| r.is_ok()).count(),
        results.len()
    );
    results
}

async fn capture_one(
    session: &Arc<CameraSession>,
    save_dir: Option<&Path>,
    batch_time: DateTime<Local>,
) -> BenchResult<CaptureResult> {
    let bytes = session.capture_still().await?;

    let file = match save_dir {
        Some(dir) => {
            tokio::fs::create_dir_all(dir).await?;
            let path = dir.join(captures::capture_filename(session.label(), batch_time));
            tokio::fs::write(&path, &bytes).await?;
            Some(path)
        }
        None => None,
    };

    Ok(CaptureResult {
        camera_id: session.id().to_string(),
        label: session.label().to_string(),
        bytes,
        file,
    })
}

/// Collapse a batch into an error when it failed partially or entirely.
///
/// `PartialCapture` is reserved for mixed outcomes; a batch where every
/// session failed is a plain `CaptureFailed`.
pub fn batch_error(results: &MultiCaptureResults) -> Option<BenchError> {
    let mut failed: Vec<String> = results
        .iter()
        .filter_map(|(id, outcome)| outcome.as_ref().err().map(|_| id.clone()))
        .collect();
    failed.sort();

    if failed.is_empty() {
        None
    } else if failed.len() == results.len() {
        let detail: Vec<String> = failed
            .iter()
            .filter_map(|id| {
                results
                    .get(id)
                    .and_then(|r| r.as_ref().err())
                    .map(|e| format!("{}: {}", id, e))
            })
            .collect();
        Some(BenchError::CaptureFailed(detail.join("; ")))
    } else {
        Some(BenchError::PartialCapture {
            attempted: results.len(),
            failed,
        })
    }
}
