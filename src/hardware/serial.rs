//! Serial `MotionTransport` for RS-232/USB-CDC motion controllers.
//!
//! Wraps the `serialport` crate and provides async I/O by running the
//! blocking serial operations on Tokio's blocking task executor. The port
//! uses a short internal read timeout so `read_line` can return control to
//! the caller's deadline loop instead of blocking indefinitely.

use crate::error::{BenchError, BenchResult};
use crate::hardware::transport::MotionTransport;
use async_trait::async_trait;
use log::debug;
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Poll granularity for reads; the overall ack deadline lives in the link.
const READ_POLL: Duration = Duration::from_millis(100);

struct PortState {
    port: Box<dyn serialport::SerialPort>,
    /// Bytes received after the last complete line.
    pending: Vec<u8>,
}

/// Serial transport. One instance owns one open port exclusively.
pub struct SerialTransport {
    port_name: String,
    state: Option<Arc<Mutex<PortState>>>,
}

impl SerialTransport {
    /// Open `port_name` at `baud`. Many controllers reset on open; callers
    /// that need the boot banner consumed should issue an acknowledged
    /// identity command first, which the link's init sequence does.
    pub fn open(port_name: &str, baud: u32) -> BenchResult<Self> {
        let port = serialport::new(port_name, baud)
            .timeout(READ_POLL)
            .open()
            .map_err(|e| {
                BenchError::DeviceUnavailable(format!(
                    "failed to open serial port '{}' at {} baud: {}",
                    port_name, baud, e
                ))
            })?;

        debug!("Serial port '{}' opened at {} baud", port_name, baud);

        Ok(Self {
            port_name: port_name.to_string(),
            state: Some(Arc::new(Mutex::new(PortState {
                port,
                pending: Vec::new(),
            }))),
        })
    }

    fn state(&self) -> BenchResult<Arc<Mutex<PortState>>> {
        self.state.clone().ok_or(BenchError::LinkDisconnected)
    }
}

#[async_trait]
impl MotionTransport for SerialTransport {
    async fn write_line(&mut self, line: &str) -> BenchResult<()> {
        let state = self.state()?;
        let payload = format!("{}\n", line.trim());

        tokio::task::spawn_blocking(move || -> BenchResult<()> {
            let mut guard = state.blocking_lock();
            guard.port.write_all(payload.as_bytes())?;
            guard.port.flush()?;
            Ok(())
        })
        .await
        .map_err(|e| BenchError::Io(std::io::Error::other(e)))??;

        debug!("[{}] sent: {}", self.port_name, line.trim());
        Ok(())
    }

    async fn read_line(&mut self) -> BenchResult<Option<String>> {
        let state = self.state()?;

        let line = tokio::task::spawn_blocking(move || -> BenchResult<Option<String>> {
            let mut guard = state.blocking_lock();
            let mut buf = [0u8; 1];

            loop {
                if let Some(pos) = guard.pending.iter().position(|&b| b == b'\n') {
                    let raw: Vec<u8> = guard.pending.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&raw).trim().to_string();
                    return Ok(Some(line));
                }

                match guard.port.read(&mut buf) {
                    Ok(1) => guard.pending.push(buf[0]),
                    Ok(_) => {
                        return Err(BenchError::Io(std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            "serial port returned EOF",
                        )))
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                        // Nothing within the poll window; caller keeps its
                        // own deadline.
                        return Ok(None);
                    }
                    Err(e) => return Err(BenchError::Io(e)),
                }
            }
        })
        .await
        .map_err(|e| BenchError::Io(std::io::Error::other(e)))??;

        if let Some(ref line) = line {
            debug!("[{}] received: {}", self.port_name, line);
        }
        Ok(line)
    }

    async fn close(&mut self) -> BenchResult<()> {
        if self.state.take().is_some() {
            debug!("Serial port '{}' closed", self.port_name);
        }
        Ok(())
    }
}
