//! Motion controller link.
//!
//! `MotionLink` owns the transport to one controller and drives the
//! line-based command/acknowledgment protocol. Commands to a link are
//! strictly serialized: a caller holds the link for its entire
//! write-then-read exchange, so write/read pairs from different callers
//! never interleave and acknowledgments come back in submission order.

pub mod gcode;

use crate::error::{BenchError, BenchResult};
use crate::hardware::transport::MotionTransport;
use gcode::{is_ack, MoveTarget};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Link to one motion controller. `Disconnected` until [`connect`]
/// succeeds; fatal transport I/O tears it back down.
///
/// [`connect`]: MotionLink::connect
pub struct MotionLink {
    /// `None` = Disconnected. The mutex is the per-link serialization
    /// discipline: one in-flight command exchange at a time.
    transport: Mutex<Option<Box<dyn MotionTransport>>>,
    ack_timeout: Duration,
}

impl MotionLink {
    pub fn new() -> Self {
        Self::with_ack_timeout(Duration::from_secs(5))
    }

    pub fn with_ack_timeout(ack_timeout: Duration) -> Self {
        Self {
            transport: Mutex::new(None),
            ack_timeout,
        }
    }

    /// Bring the link up over `transport`.
    ///
    /// Runs the init handshake — identity query, millimeter units, absolute
    /// positioning — requiring an acknowledgment for each before the link
    /// counts as ready. Reconnecting over an existing connection tears the
    /// old transport down first.
    pub async fn connect(&self, mut transport: Box<dyn MotionTransport>) -> BenchResult<()> {
        for command in [
            gcode::FIRMWARE_INFO,
            gcode::UNITS_MM,
            gcode::ABSOLUTE_POSITIONING,
        ] {
            if let Err(e) = Self::submit(transport.as_mut(), command, true, self.ack_timeout).await
            {
                warn!("Motion link handshake failed at '{}': {}", command, e);
                let _ = transport.close().await;
                return Err(e);
            }
        }

        let mut guard = self.transport.lock().await;
        if let Some(mut old) = guard.replace(transport) {
            let _ = old.close().await;
        }
        info!("Motion link connected");
        Ok(())
    }

    /// Tear the link down. Safe when already disconnected.
    pub async fn disconnect(&self) -> BenchResult<()> {
        let mut guard = self.transport.lock().await;
        if let Some(mut transport) = guard.take() {
            transport.close().await?;
            info!("Motion link disconnected");
        }
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.transport.lock().await.is_some()
    }

    /// Send a command sequence, optionally waiting for each line's
    /// acknowledgment.
    ///
    /// Returns the informational response lines read while waiting (the
    /// lines a position report arrives on). A timed-out command is not
    /// retried — the caller decides. Fatal I/O drops the transport, leaving
    /// the link Disconnected.
    pub async fn send_commands(
        &self,
        commands: &[String],
        wait_for_ack: bool,
    ) -> BenchResult<Vec<String>> {
        let mut guard = self.transport.lock().await;
        let mut info_lines = Vec::new();

        for command in commands {
            let transport = guard.as_mut().ok_or(BenchError::LinkDisconnected)?;
            match Self::submit(transport.as_mut(), command, wait_for_ack, self.ack_timeout).await
            {
                Ok(mut lines) => info_lines.append(&mut lines),
                Err(e) => {
                    if matches!(e, BenchError::Io(_)) {
                        if let Some(mut dead) = guard.take() {
                            let _ = dead.close().await;
                        }
                        warn!("Motion link torn down after transport failure: {}", e);
                    }
                    return Err(e);
                }
            }
        }
        Ok(info_lines)
    }

    /// Write one line and, when requested, read until its acknowledgment.
    async fn submit(
        transport: &mut dyn MotionTransport,
        command: &str,
        wait_for_ack: bool,
        ack_timeout: Duration,
    ) -> BenchResult<Vec<String>> {
        transport.write_line(command).await?;
        debug!("motion > {}", command);

        if !wait_for_ack {
            return Ok(Vec::new());
        }
        Self::await_ack(transport, ack_timeout).await
    }

    /// Read response lines until the ack token, collecting informational
    /// lines. Bounded: a silent transport produces `AckTimeout`, never an
    /// indefinite hang.
    async fn await_ack(
        transport: &mut dyn MotionTransport,
        ack_timeout: Duration,
    ) -> BenchResult<Vec<String>> {
        let deadline = Instant::now() + ack_timeout;
        let mut lines = Vec::new();

        while Instant::now() < deadline {
            match transport.read_line().await? {
                Some(line) if is_ack(&line) => {
                    debug!("motion < {}", line);
                    return Ok(lines);
                }
                Some(line) => {
                    if !line.is_empty() {
                        debug!("motion < {}", line);
                        lines.push(line);
                    }
                }
                None => {}
            }
        }
        Err(BenchError::AckTimeout(ack_timeout))
    }

    /// Absolute move; acknowledged, and with the completion barrier set the
    /// final ack corresponds to physical motion completion.
    pub async fn move_to(&self, target: &MoveTarget) -> BenchResult<()> {
        self.send_commands(&gcode::move_sequence(target), true)
            .await
            .map(|_| ())
    }

    /// Home the selected axes (all three when empty).
    pub async fn home(&self, axes: &str) -> BenchResult<()> {
        self.send_commands(&gcode::home_sequence(axes), true)
            .await
            .map(|_| ())
    }

    /// Declare the current position to be the given logical coordinates.
    pub async fn set_origin(&self, x: f64, y: f64, z: f64) -> BenchResult<()> {
        self.send_commands(&gcode::set_origin_sequence(x, y, z), true)
            .await
            .map(|_| ())
    }

    /// Emergency stop. Fire-and-forget: the controller halts, so no
    /// acknowledgment is awaited.
    pub async fn emergency_stop(&self) -> BenchResult<()> {
        self.send_commands(&[gcode::EMERGENCY_STOP.to_string()], false)
            .await
            .map(|_| ())
    }

    /// Query the controller's reported coordinates.
    ///
    /// The report arrives on the informational lines before the ack; the
    /// parsed axes come back keyed by lowercase axis letter.
    pub async fn position(&self) -> BenchResult<HashMap<String, f64>> {
        let lines = self
            .send_commands(&[gcode::POSITION_REPORT.to_string()], true)
            .await?;
        Ok(gcode::parse_position_report(&lines))
    }
}

impl Default for MotionLink {
    fn default() -> Self {
        Self::new()
    }
}
