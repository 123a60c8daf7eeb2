//! Mock hardware for tests and hardware-free development.
//!
//! `MockCamera` synthesizes JPEG frames deterministically; `MockTransport`
//! plays the controller side of the ack protocol. Both support failure
//! injection so the error paths of the session and link layers can be
//! exercised without devices attached.

use crate::broadcast::FrameBroadcast;
use crate::error::{BenchError, BenchResult};
use crate::hardware::camera::{
    CameraDevice, CameraIdentity, CameraProvider, ControlValue, StillPayload, StreamProfile,
};
use crate::hardware::transport::MotionTransport;
use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use log::info;
use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Configuration for one mock camera in a [`MockCameraFleet`].
#[derive(Clone, Debug)]
pub struct MockCameraSpec {
    pub model: Option<String>,
    /// Every `capture_still` fails with `CaptureFailed`.
    pub fail_capture: bool,
    /// Stills come back as temp files instead of in-memory bytes.
    pub capture_to_file: bool,
    /// Metadata reads fail (sessions must degrade to empty).
    pub fail_metadata: bool,
    /// A control with this device name is rejected on apply.
    pub reject_control: Option<String>,
    pub preview_size: (u32, u32),
    pub still_size: (u32, u32),
    pub frame_interval: Duration,
}

impl Default for MockCameraSpec {
    fn default() -> Self {
        Self {
            model: None,
            fail_capture: false,
            capture_to_file: false,
            fail_metadata: false,
            reject_control: None,
            preview_size: (64, 48),
            still_size: (256, 192),
            frame_interval: Duration::from_millis(20),
        }
    }
}

impl MockCameraSpec {
    pub fn with_model(model: &str) -> Self {
        Self {
            model: Some(model.to_string()),
            ..Self::default()
        }
    }
}

/// A camera that produces deterministic gradient frames.
pub struct MockCamera {
    spec: MockCameraSpec,
    profile: StreamProfile,
    frame_counter: Arc<AtomicU64>,
    applied_controls: HashMap<String, ControlValue>,
    task_handle: Option<JoinHandle<()>>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    released: bool,
}

impl MockCamera {
    pub fn new(spec: MockCameraSpec) -> Self {
        Self {
            spec,
            profile: StreamProfile::Preview,
            frame_counter: Arc::new(AtomicU64::new(0)),
            applied_controls: HashMap::new(),
            task_handle: None,
            shutdown_tx: None,
            released: false,
        }
    }

    /// Total frames pushed through the preview path so far.
    pub fn frames_published(&self) -> u64 {
        self.frame_counter.load(Ordering::Relaxed)
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    fn current_size(&self) -> (u32, u32) {
        match self.profile {
            StreamProfile::Preview => self.spec.preview_size,
            StreamProfile::Still => self.spec.still_size,
        }
    }
}

/// Deterministic gradient test frame. The seed shifts the pattern so
/// consecutive frames differ.
pub fn synthetic_jpeg(width: u32, height: u32, seed: u64) -> BenchResult<Vec<u8>> {
    let shift = (seed % 251) as u32;
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            ((x + shift) % 256) as u8,
            ((y + shift) % 256) as u8,
            ((x + y) % 256) as u8,
        ])
    });
    let mut buf = Cursor::new(Vec::new());
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, 80);
    encoder.encode_image(&img)?;
    Ok(buf.into_inner())
}

#[async_trait]
impl CameraDevice for MockCamera {
    fn identity(&self) -> CameraIdentity {
        CameraIdentity {
            model: self.spec.model.clone(),
        }
    }

    async fn configure(&mut self, profile: StreamProfile) -> BenchResult<()> {
        self.profile = profile;
        Ok(())
    }

    async fn start_preview(&mut self, sink: FrameBroadcast) -> BenchResult<()> {
        if self.task_handle.is_some() {
            return Ok(());
        }

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();
        let counter = self.frame_counter.clone();
        let (width, height) = self.spec.preview_size;
        let frame_interval = self.spec.frame_interval;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(frame_interval);
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = interval.tick() => {
                        let seed = counter.fetch_add(1, Ordering::Relaxed);
                        if let Ok(jpeg) = synthetic_jpeg(width, height, seed) {
                            sink.publish(Bytes::from(jpeg));
                        }
                    }
                }
            }
        });

        self.task_handle = Some(handle);
        self.shutdown_tx = Some(shutdown_tx);
        Ok(())
    }

    async fn stop_preview(&mut self) -> BenchResult<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
        Ok(())
    }

    async fn capture_still(&mut self) -> BenchResult<StillPayload> {
        if self.spec.fail_capture {
            return Err(BenchError::CaptureFailed(
                "injected mock capture failure".to_string(),
            ));
        }

        let (width, height) = self.current_size();
        let seed = self.frame_counter.fetch_add(1, Ordering::Relaxed);
        let jpeg = synthetic_jpeg(width, height, seed)?;

        if self.spec.capture_to_file {
            let name = format!(
                "scanbench_mock_{}_{}.jpg",
                chrono::Local::now().format("%Y%m%d_%H%M%S_%6f"),
                seed
            );
            let path = std::env::temp_dir().join(name);
            tokio::fs::write(&path, &jpeg).await?;
            Ok(StillPayload::TempFile(path))
        } else {
            Ok(StillPayload::Bytes(Bytes::from(jpeg)))
        }
    }

    async fn apply_controls(&mut self, controls: &[(String, ControlValue)]) -> BenchResult<()> {
        if let Some(ref rejected) = self.spec.reject_control {
            if controls.iter().any(|(name, _)| name == rejected) {
                return Err(BenchError::ControlRejected(format!(
                    "mock device does not support '{}'",
                    rejected
                )));
            }
        }
        for (name, value) in controls {
            self.applied_controls.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    async fn read_metadata(&mut self) -> BenchResult<HashMap<String, ControlValue>> {
        if self.spec.fail_metadata {
            return Err(BenchError::DeviceUnavailable(
                "injected mock metadata failure".to_string(),
            ));
        }
        let mut snapshot = self.applied_controls.clone();
        snapshot.insert(
            "FrameCount".to_string(),
            ControlValue::Int(self.frames_published() as i64),
        );
        Ok(snapshot)
    }

    async fn release(&mut self) -> BenchResult<()> {
        self.stop_preview().await?;
        self.released = true;
        Ok(())
    }
}

/// Provider that enumerates a configured set of mock cameras.
pub struct MockCameraFleet {
    specs: Vec<MockCameraSpec>,
    fail_enumerate: bool,
}

impl MockCameraFleet {
    pub fn new(specs: Vec<MockCameraSpec>) -> Self {
        Self {
            specs,
            fail_enumerate: false,
        }
    }

    /// A fleet whose enumeration fails, for startup-error tests.
    pub fn unavailable() -> Self {
        Self {
            specs: Vec::new(),
            fail_enumerate: true,
        }
    }
}

impl CameraProvider for MockCameraFleet {
    fn enumerate(&self) -> BenchResult<Vec<Box<dyn CameraDevice>>> {
        if self.fail_enumerate {
            return Err(BenchError::DeviceUnavailable(
                "mock enumeration failure".to_string(),
            ));
        }
        info!("Enumerated {} mock camera(s)", self.specs.len());
        Ok(self
            .specs
            .iter()
            .map(|spec| Box::new(MockCamera::new(spec.clone())) as Box<dyn CameraDevice>)
            .collect())
    }
}

/// Scripted controller transport.
///
/// Every written line is recorded; unless silenced, each command that
/// expects a response is answered with optional chatter lines followed by
/// the `ok` token. A position query is answered with a canned report first.
pub struct MockTransport {
    log: Arc<Mutex<Vec<String>>>,
    queue: VecDeque<String>,
    chatter: Vec<String>,
    position_report: String,
    silent: bool,
    /// Remaining commands that will be answered; when it hits zero the
    /// controller goes quiet mid-session.
    ack_budget: Option<usize>,
    closed: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            queue: VecDeque::new(),
            chatter: Vec::new(),
            position_report: "X:50.00 Y:50.00 Z:10.00 E:0.00 Count X:4000 Y:4000 Z:800"
                .to_string(),
            silent: false,
            ack_budget: None,
            closed: false,
        }
    }

    /// Never produce any response bytes; every ack wait must time out.
    pub fn silent() -> Self {
        Self {
            silent: true,
            ..Self::new()
        }
    }

    /// Informational lines emitted before each `ok`.
    pub fn with_chatter(mut self, lines: &[&str]) -> Self {
        self.chatter = lines.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_position_report(mut self, report: &str) -> Self {
        self.position_report = report.to_string();
        self
    }

    /// Answer only the first `commands` commands, then fall silent.
    pub fn with_ack_budget(mut self, commands: usize) -> Self {
        self.ack_budget = Some(commands);
        self
    }

    /// Shared handle to the record of written lines.
    pub fn log_handle(&self) -> Arc<Mutex<Vec<String>>> {
        self.log.clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MotionTransport for MockTransport {
    async fn write_line(&mut self, line: &str) -> BenchResult<()> {
        if self.closed {
            return Err(BenchError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "transport closed",
            )));
        }

        if let Ok(mut log) = self.log.lock() {
            log.push(line.to_string());
        }

        if self.silent {
            return Ok(());
        }

        if let Some(budget) = self.ack_budget.as_mut() {
            if *budget == 0 {
                return Ok(());
            }
            *budget -= 1;
        }

        // The emergency stop halts the controller; nothing comes back.
        if line.trim() == "M112" {
            return Ok(());
        }

        for chatter in &self.chatter {
            self.queue.push_back(chatter.clone());
        }
        if line.trim().starts_with("M114") {
            let report = self.position_report.clone();
            self.queue.push_back(report);
        }
        self.queue.push_back("ok".to_string());
        Ok(())
    }

    async fn read_line(&mut self) -> BenchResult<Option<String>> {
        match self.queue.pop_front() {
            Some(line) => Ok(Some(line)),
            None => {
                // Quiet wire; keep the caller's deadline loop cheap.
                tokio::time::sleep(Duration::from_millis(2)).await;
                Ok(None)
            }
        }
    }

    async fn close(&mut self) -> BenchResult<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_camera_preview_publishes_frames() {
        let mut camera = MockCamera::new(MockCameraSpec::default());
        let frames = FrameBroadcast::new();

        camera.configure(StreamProfile::Preview).await.unwrap();
        camera.start_preview(frames.clone()).await.unwrap();

        let frame = frames.await_next().await.unwrap();
        assert!(!frame.is_empty());

        camera.stop_preview().await.unwrap();
        assert!(camera.frames_published() > 0);
    }

    #[tokio::test]
    async fn release_stops_preview_and_marks_device() {
        let mut camera = MockCamera::new(MockCameraSpec::default());
        let frames = FrameBroadcast::new();
        camera.start_preview(frames).await.unwrap();

        camera.release().await.unwrap();
        assert!(camera.is_released());
    }

    #[tokio::test]
    async fn mock_transport_acks_commands() {
        let mut transport = MockTransport::new();
        transport.write_line("G28 XYZ").await.unwrap();
        assert_eq!(transport.read_line().await.unwrap().as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn silent_transport_never_responds() {
        let mut transport = MockTransport::silent();
        transport.write_line("G28").await.unwrap();
        assert_eq!(transport.read_line().await.unwrap(), None);
    }
}
