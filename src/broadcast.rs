//! Single-slot live-frame broadcast.
//!
//! A `FrameBroadcast` sits between a camera's continuous encoder and any
//! number of streaming consumers. The producer overwrites a single slot on
//! every publish; consumers block until the next publish and then all
//! receive the same frame. Frames are never queued: a consumer that is busy
//! while frames are published simply observes a subset of the stream. That
//! loss is the designed behavior for live preview, not a defect.

use crate::error::{BenchError, BenchResult};
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::watch;

/// Broadcast handle. Cheap to clone; all clones share the same slot.
#[derive(Clone)]
pub struct FrameBroadcast {
    slot: Arc<watch::Sender<Option<Bytes>>>,
}

impl FrameBroadcast {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { slot: Arc::new(tx) }
    }

    /// Store a frame and wake every consumer currently waiting in
    /// [`await_next`](Self::await_next).
    pub fn publish(&self, frame: Bytes) {
        self.slot.send_replace(Some(frame));
    }

    /// Wait for the next frame published after this call began.
    ///
    /// A frame already sitting in the slot is never returned; the waiter
    /// suspends until the producer publishes again. Every concurrent waiter
    /// woken by the same publish receives the same frame.
    pub async fn await_next(&self) -> BenchResult<Bytes> {
        let mut rx = self.slot.subscribe();
        rx.changed().await.map_err(|_| BenchError::StreamClosed)?;
        let frame = rx.borrow_and_update().clone();
        frame.ok_or(BenchError::StreamClosed)
    }

    /// Latest published frame, if any, without waiting.
    pub fn latest(&self) -> Option<Bytes> {
        self.slot.borrow().clone()
    }
}

impl Default for FrameBroadcast {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn waiter_only_sees_frames_published_after_call() {
        let frames = FrameBroadcast::new();
        frames.publish(Bytes::from_static(b"stale"));

        let waiter = {
            let frames = frames.clone();
            tokio::spawn(async move { frames.await_next().await })
        };

        // Give the waiter time to subscribe before publishing.
        tokio::time::sleep(Duration::from_millis(20)).await;
        frames.publish(Bytes::from_static(b"fresh"));

        let got = waiter.await.unwrap().unwrap();
        assert_eq!(&got[..], b"fresh");
    }

    #[tokio::test]
    async fn all_waiters_receive_the_same_frame() {
        let frames = FrameBroadcast::new();

        let mut waiters = Vec::new();
        for _ in 0..4 {
            let frames = frames.clone();
            waiters.push(tokio::spawn(async move { frames.await_next().await }));
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        frames.publish(Bytes::from_static(b"frame-1"));

        for waiter in waiters {
            let got = waiter.await.unwrap().unwrap();
            assert_eq!(&got[..], b"frame-1");
        }
    }

    #[tokio::test]
    async fn slow_consumer_observes_subset_never_stale() {
        let frames = FrameBroadcast::new();

        for i in 0..10u8 {
            frames.publish(Bytes::from(vec![i]));
        }
        // Slot holds only the newest value.
        assert_eq!(frames.latest().unwrap()[0], 9);

        let waiter = {
            let frames = frames.clone();
            tokio::spawn(async move { frames.await_next().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        frames.publish(Bytes::from(vec![42]));

        assert_eq!(waiter.await.unwrap().unwrap()[0], 42);
    }
}
