//! MJPEG multipart framing.
//!
//! Turns a [`FrameBroadcast`] subscription into the boundary-delimited parts
//! an HTTP layer writes into a `multipart/x-mixed-replace` response. The
//! stream is fps-capped — frames above the cap are skipped, which the
//! broadcast makes free — and can run each frame through the transform
//! pipeline, falling back to the raw frame when a transform fails (a bad
//! frame should cost one preview frame, not the stream).

use crate::broadcast::FrameBroadcast;
use crate::error::BenchResult;
use crate::transform::{transform, TransformRequest};
use bytes::{BufMut, Bytes, BytesMut};
use log::debug;
use std::time::{Duration, Instant};

/// Value for the HTTP `Content-Type` header of the whole response.
pub const MULTIPART_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

const BOUNDARY: &[u8] = b"--frame";

/// Framed live stream over one camera's broadcast.
pub struct MjpegStream {
    frames: FrameBroadcast,
    min_interval: Duration,
    last_emit: Option<Instant>,
    transform: Option<TransformRequest>,
}

impl MjpegStream {
    /// Stream from `frames`, emitting at most `max_fps` parts per second.
    pub fn new(frames: FrameBroadcast, max_fps: u32) -> Self {
        Self {
            frames,
            min_interval: Duration::from_secs_f64(1.0 / f64::from(max_fps.max(1))),
            last_emit: None,
            transform: None,
        }
    }

    /// Apply a transform to every emitted frame.
    pub fn with_transform(mut self, request: TransformRequest) -> Self {
        self.transform = Some(request);
        self
    }

    /// Wait for the next frame due under the fps cap and frame it as a
    /// multipart chunk.
    pub async fn next_part(&mut self) -> BenchResult<Bytes> {
        loop {
            let frame = self.frames.await_next().await?;

            if let Some(last) = self.last_emit {
                if last.elapsed() < self.min_interval {
                    continue;
                }
            }
            self.last_emit = Some(Instant::now());

            let payload = match &self.transform {
                Some(request) => match transform(&frame, request) {
                    Ok(transformed) => Bytes::from(transformed),
                    Err(e) => {
                        debug!("stream transform failed, passing raw frame: {}", e);
                        frame
                    }
                },
                None => frame,
            };

            return Ok(frame_part(&payload));
        }
    }
}

/// Assemble one multipart chunk around a JPEG payload.
pub fn frame_part(payload: &[u8]) -> Bytes {
    let mut part = BytesMut::with_capacity(payload.len() + 96);
    part.put_slice(BOUNDARY);
    part.put_slice(b"\r\nContent-Type: image/jpeg\r\nContent-Length: ");
    part.put_slice(payload.len().to_string().as_bytes());
    part.put_slice(b"\r\n\r\n");
    part.put_slice(payload);
    part.put_slice(b"\r\n");
    part.freeze()
}
