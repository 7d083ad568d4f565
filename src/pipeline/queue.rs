//! Frame delivery conduit.
//!
//! One bounded channel per streaming session, depth 1: the pipeline favors
//! freshness over completeness, so when production outruns consumption the
//! oldest undelivered frameset is discarded. The producer side
//! ([`FrameSink`]) is cloned into driver capture threads; the consumer side
//! ([`FrameQueue`]) backs `wait_for_frames`/`poll_for_frames`. Dropping
//! every sink clone disconnects the channel, which is how `stop()` wakes a
//! blocked wait.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use log::debug;
use parking_lot::Mutex;

use crate::error::{PipelineError, Result};
use crate::pipeline::types::Frameset;

/// Producer handle a device delivers synchronized framesets into.
#[derive(Clone)]
pub struct FrameSink {
    tx: Sender<Frameset>,
    rx: Receiver<Frameset>,
    // Serializes concurrent producers so the evict-then-send pair below
    // stays atomic with respect to other sinks.
    lock: Arc<Mutex<()>>,
    // Observer invoked for every pushed frameset, before enqueueing.
    // Recording wrappers attach here so persistence sees frames the
    // depth-1 queue may later evict.
    tap: Option<Arc<dyn Fn(&Frameset) + Send + Sync>>,
}

impl FrameSink {
    /// Attach an observer that sees every frameset, including ones the
    /// queue later discards.
    pub fn with_tap(mut self, tap: Arc<dyn Fn(&Frameset) + Send + Sync>) -> FrameSink {
        self.tap = Some(tap);
        self
    }

    /// Deliver one frameset, evicting the undelivered one if the queue is
    /// full. Never blocks the capture thread.
    pub fn push(&self, frameset: Frameset) {
        if let Some(tap) = &self.tap {
            tap(&frameset);
        }
        let _guard = self.lock.lock();
        if let Err(TrySendError::Full(frameset)) = self.tx.try_send(frameset) {
            // Consumer hasn't caught up: drop the stale frameset.
            if self.rx.try_recv().is_ok() {
                debug!("frame queue full, dropped stale frameset");
            }
            // Can still race a concurrent dequeue; losing the new frameset
            // instead of the old one is acceptable either way.
            let _ = self.tx.try_send(frameset);
        }
    }
}

/// Consumer handle owned by the pipeline. Clones share the queue, which
/// lets `wait_for_frames` block outside the pipeline lock.
#[derive(Clone)]
pub struct FrameQueue {
    rx: Receiver<Frameset>,
}

impl FrameQueue {
    /// Create a depth-1 session conduit.
    pub fn channel() -> (FrameSink, FrameQueue) {
        let (tx, rx) = bounded(1);
        let sink = FrameSink {
            tx,
            rx: rx.clone(),
            lock: Arc::new(Mutex::new(())),
            tap: None,
        };
        (sink, FrameQueue { rx })
    }

    /// Block until a frameset arrives or `timeout` elapses.
    ///
    /// Disconnection (every sink dropped, i.e. the session stopped while
    /// this wait was blocked) surfaces as `InvalidState`; a frameset that
    /// was already queued when the sinks were dropped is still delivered.
    pub fn wait(&self, timeout: Duration) -> Result<Frameset> {
        match self.rx.recv_timeout(timeout) {
            Ok(frameset) => Ok(frameset),
            Err(RecvTimeoutError::Timeout) => {
                Err(PipelineError::Timeout(timeout.as_millis() as u64))
            }
            Err(RecvTimeoutError::Disconnected) => Err(PipelineError::InvalidState(
                "pipeline stopped while waiting for frames".into(),
            )),
        }
    }

    /// Dequeue a frameset if one is available, without blocking.
    pub fn poll(&self) -> Option<Frameset> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::Timestamp;

    fn frameset(n: i64) -> Frameset {
        Frameset::new(Vec::new(), Timestamp::from_micros(n))
    }

    #[test]
    fn test_poll_empty_returns_none() {
        let (_sink, queue) = FrameQueue::channel();
        assert!(queue.poll().is_none());
    }

    #[test]
    fn test_push_then_wait() {
        let (sink, queue) = FrameQueue::channel();
        sink.push(frameset(1));
        let fs = queue.wait(Duration::from_millis(10)).unwrap();
        assert_eq!(fs.timestamp(), Timestamp::from_micros(1));
    }

    #[test]
    fn test_newest_frameset_wins() {
        let (sink, queue) = FrameQueue::channel();
        sink.push(frameset(1));
        sink.push(frameset(2));
        sink.push(frameset(3));
        // Only the most recent survives
        let fs = queue.wait(Duration::from_millis(10)).unwrap();
        assert_eq!(fs.timestamp(), Timestamp::from_micros(3));
        assert!(queue.poll().is_none());
    }

    #[test]
    fn test_wait_times_out() {
        let (_sink, queue) = FrameQueue::channel();
        let err = queue.wait(Duration::from_millis(5)).unwrap_err();
        assert!(matches!(err, PipelineError::Timeout(5)));
    }

    #[test]
    fn test_disconnect_wakes_wait() {
        let (sink, queue) = FrameQueue::channel();
        let waiter = std::thread::spawn(move || queue.wait(Duration::from_secs(5)));
        std::thread::sleep(Duration::from_millis(20));
        drop(sink);
        let err = waiter.join().unwrap().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidState(_)));
    }

    #[test]
    fn test_queued_frameset_survives_disconnect() {
        let (sink, queue) = FrameQueue::channel();
        sink.push(frameset(9));
        drop(sink);
        let fs = queue.wait(Duration::from_millis(10)).unwrap();
        assert_eq!(fs.timestamp(), Timestamp::from_micros(9));
        // Nothing more can ever arrive
        assert!(queue.wait(Duration::from_millis(10)).is_err());
    }
}
