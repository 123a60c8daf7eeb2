//! Motion-controller transport interface.
//!
//! A transport is a line-oriented byte pipe to one controller. The link
//! layer above owns it exclusively and serializes every write/read pair, so
//! implementations only need interior consistency, not cross-call locking.

use crate::error::BenchResult;
use async_trait::async_trait;

/// Line transport to a motion controller.
#[async_trait]
pub trait MotionTransport: Send {
    /// Write one command line. The implementation appends the line
    /// terminator and flushes before returning.
    async fn write_line(&mut self, line: &str) -> BenchResult<()>;

    /// Read one response line, trimmed of terminators.
    ///
    /// Returns `Ok(None)` when nothing arrived within the transport's short
    /// internal poll interval; the caller loops against its own deadline.
    /// An `Err` is a fatal transport failure.
    async fn read_line(&mut self) -> BenchResult<Option<String>>;

    /// Tear down the connection. Called once; the transport is dropped
    /// afterwards.
    async fn close(&mut self) -> BenchResult<()>;
}
