//! Camera session: one physical camera, one frame broadcast.
//!
//! While idle the session runs the device's continuous encode path into its
//! [`FrameBroadcast`]. A still capture takes the session's exclusive lock,
//! pauses the encoder, switches the device to the full-resolution profile,
//! captures, and restores the preview path — on every exit path, so the
//! session can never be left stuck outside streaming mode.

use crate::broadcast::FrameBroadcast;
use crate::camera::controls;
use crate::captures;
use crate::error::{BenchError, BenchResult};
use crate::hardware::camera::{CameraDevice, ControlValue, StillPayload, StreamProfile};
use bytes::Bytes;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use tokio::sync::Mutex;

/// Observable session mode. `SwitchingToStill` covers the whole exclusive
/// capture window; both stable endpoints are `Streaming`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionMode {
    Streaming,
    SwitchingToStill,
}

const MODE_STREAMING: u8 = 0;
const MODE_SWITCHING: u8 = 1;

pub struct CameraSession {
    id: String,
    label: String,
    index: usize,
    frames: FrameBroadcast,
    /// The session's exclusive lock: capture and control mutation serialize
    /// here. Streaming consumers never touch it.
    device: Mutex<Box<dyn CameraDevice>>,
    mode: AtomicU8,
    stopped: AtomicBool,
}

impl CameraSession {
    /// Configure the device for preview and start the continuous encode
    /// path. The session owns the device exclusively from here on.
    pub(crate) async fn start(
        id: String,
        label: String,
        index: usize,
        mut device: Box<dyn CameraDevice>,
    ) -> BenchResult<Self> {
        let frames = FrameBroadcast::new();
        device.configure(StreamProfile::Preview).await?;
        device.start_preview(frames.clone()).await?;

        info!("Camera session '{}' ({}) streaming", id, label);

        Ok(Self {
            id,
            label,
            index,
            frames,
            device: Mutex::new(device),
            mode: AtomicU8::new(MODE_STREAMING),
            stopped: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Handle to this session's live frame slot.
    pub fn frames(&self) -> FrameBroadcast {
        self.frames.clone()
    }

    pub fn mode(&self) -> SessionMode {
        match self.mode.load(Ordering::SeqCst) {
            MODE_SWITCHING => SessionMode::SwitchingToStill,
            _ => SessionMode::Streaming,
        }
    }

    /// Best-effort snapshot of current sensor state. Metadata is advisory
    /// telemetry; acquisition failures degrade to an empty map.
    pub async fn metadata(&self) -> HashMap<String, ControlValue> {
        let mut device = self.device.lock().await;
        match device.read_metadata().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!("[{}] metadata read failed: {}", self.label, e);
                HashMap::new()
            }
        }
    }

    /// Translate and apply a friendly control set.
    ///
    /// Returns the keys whose enum value names were dropped by translation.
    /// An empty effective set never touches the device. Device-side
    /// rejection of an explicitly supplied control propagates.
    pub async fn set_controls(
        &self,
        requested: &HashMap<String, ControlValue>,
    ) -> BenchResult<Vec<String>> {
        let translated = controls::translate(requested)?;

        if !translated.dropped.is_empty() {
            warn!(
                "[{}] dropping controls with unknown values: {:?}",
                self.label, translated.dropped
            );
        }
        if translated.device_controls.is_empty() {
            return Ok(translated.dropped);
        }

        let mut device = self.device.lock().await;
        device.apply_controls(&translated.device_controls).await?;
        debug!(
            "[{}] applied {} control(s)",
            self.label,
            translated.device_controls.len()
        );
        Ok(translated.dropped)
    }

    /// Capture a full-resolution still, returning the encoded bytes.
    ///
    /// The whole sequence runs under the session lock: pause preview,
    /// switch to the still profile, capture, switch back, resume preview.
    /// Restoration runs whether or not the capture succeeded.
    pub async fn capture_still(&self) -> BenchResult<Bytes> {
        let mut device = self.device.lock().await;
        self.mode.store(MODE_SWITCHING, Ordering::SeqCst);

        if let Err(e) = device.stop_preview().await {
            warn!("[{}] pausing preview before capture failed: {}", self.label, e);
        }

        let captured = Self::capture_locked(&mut device).await;
        let restored = Self::restore_streaming(&mut device, &self.frames).await;
        self.mode.store(MODE_STREAMING, Ordering::SeqCst);

        match (captured, restored) {
            (Ok(bytes), Ok(())) => Ok(bytes),
            (Ok(_), Err(e)) => Err(BenchError::CaptureFailed(format!(
                "capture succeeded but preview restore failed: {}",
                e
            ))),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(restore_err)) => {
                warn!(
                    "[{}] preview restore after failed capture also failed: {}",
                    self.label, restore_err
                );
                Err(e)
            }
        }
    }

    /// Capture a still and persist it under `dir`.
    ///
    /// The file name embeds the session label and a microsecond timestamp,
    /// so rapid repeated captures from the same session never collide.
    pub async fn capture_still_to_file(&self, dir: &Path) -> BenchResult<PathBuf> {
        let bytes = self.capture_still().await?;

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(captures::capture_filename(&self.label, chrono::Local::now()));
        tokio::fs::write(&path, &bytes).await?;
        info!("[{}] saved capture to {}", self.label, path.display());
        Ok(path)
    }

    async fn capture_locked(device: &mut Box<dyn CameraDevice>) -> BenchResult<Bytes> {
        device.configure(StreamProfile::Still).await?;

        match device.capture_still().await? {
            StillPayload::Bytes(bytes) => Ok(bytes),
            StillPayload::TempFile(path) => {
                let read = tokio::fs::read(&path).await;
                // The temporary file goes away no matter how the read went.
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    warn!(
                        "failed to remove temporary capture file {}: {}",
                        path.display(),
                        e
                    );
                }
                read.map(Bytes::from).map_err(|e| {
                    BenchError::CaptureFailed(format!(
                        "reading temporary capture file back failed: {}",
                        e
                    ))
                })
            }
        }
    }

    async fn restore_streaming(
        device: &mut Box<dyn CameraDevice>,
        frames: &FrameBroadcast,
    ) -> BenchResult<()> {
        device.configure(StreamProfile::Preview).await?;
        device.start_preview(frames.clone()).await
    }

    /// Stop the continuous encode path and release the device. Idempotent;
    /// safe to call during shutdown even if the session never fully started.
    pub async fn stop(&self) -> BenchResult<()> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut device = self.device.lock().await;
        if let Err(e) = device.stop_preview().await {
            warn!("[{}] stopping preview failed: {}", self.label, e);
        }
        device.release().await?;
        info!("Camera session '{}' stopped", self.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::mock::{MockCamera, MockCameraSpec};

    async fn session(spec: MockCameraSpec) -> CameraSession {
        CameraSession::start(
            "cam0".to_string(),
            "test_cam".to_string(),
            0,
            Box::new(MockCamera::new(spec)),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn metadata_failure_degrades_to_empty() {
        let session = session(MockCameraSpec {
            fail_metadata: true,
            ..MockCameraSpec::default()
        })
        .await;

        assert!(session.metadata().await.is_empty());
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn set_controls_empty_input_is_noop() {
        let session = session(MockCameraSpec::default()).await;
        let dropped = session.set_controls(&HashMap::new()).await.unwrap();
        assert!(dropped.is_empty());
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn controls_show_up_in_metadata() {
        let session = session(MockCameraSpec::default()).await;

        let mut requested = HashMap::new();
        requested.insert("exposure_time".to_string(), ControlValue::Int(10_000));
        session.set_controls(&requested).await.unwrap();

        let metadata = session.metadata().await;
        assert_eq!(
            metadata.get("ExposureTime"),
            Some(&ControlValue::Int(10_000))
        );
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let session = session(MockCameraSpec::default()).await;
        session.stop().await.unwrap();
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn mode_is_streaming_when_idle() {
        let session = session(MockCameraSpec::default()).await;
        assert_eq!(session.mode(), SessionMode::Streaming);
        session.stop().await.unwrap();
    }
}
