//! Core frame types for the pipeline system.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::device::profile::{StreamKey, StreamKind, StreamProfile};

/// Timestamp representation for captured frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    /// Microseconds since stream start
    pub micros: i64,
}

impl Timestamp {
    /// Create a new timestamp from microseconds
    pub fn from_micros(micros: i64) -> Self {
        Self { micros }
    }

    /// Create a timestamp from duration since stream start
    pub fn from_duration(duration: Duration) -> Self {
        Self {
            micros: duration.as_micros() as i64,
        }
    }

    /// Create a timestamp from instant relative to base
    pub fn from_instant(instant: Instant, base: Instant) -> Self {
        let duration = instant.saturating_duration_since(base);
        Self::from_duration(duration)
    }

    /// Convert to duration
    pub fn as_duration(&self) -> Duration {
        Duration::from_micros(self.micros.max(0) as u64)
    }

    /// Calculate the absolute difference between two timestamps
    pub fn diff(&self, other: Timestamp) -> Duration {
        let diff_micros = (self.micros - other.micros).abs();
        Duration::from_micros(diff_micros as u64)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}us", self.micros)
    }
}

/// A single captured frame from one stream.
#[derive(Clone)]
pub struct Frame {
    /// Profile the frame was captured under
    pub profile: StreamProfile,
    /// Raw sensor payload
    pub data: Bytes,
    /// Capture timestamp
    pub timestamp: Timestamp,
    /// Monotonic per-stream counter
    pub frame_number: u64,
}

impl Frame {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("profile", &self.profile.to_string())
            .field("timestamp", &self.timestamp)
            .field("frame_number", &self.frame_number)
            .field("size", &self.size())
            .finish()
    }
}

/// A time-aligned bundle of frames from the active streams.
///
/// Framesets are reference counted; the bundle handed to the caller by
/// `wait_for_frames`/`poll_for_frames` is never reused internally, so the
/// caller may hold it as long as it needs. Dropping the last clone
/// releases the payloads.
#[derive(Clone)]
pub struct Frameset {
    inner: Arc<FramesetInner>,
}

struct FramesetInner {
    frames: Vec<Frame>,
    timestamp: Timestamp,
}

impl Frameset {
    pub fn new(frames: Vec<Frame>, timestamp: Timestamp) -> Self {
        Self {
            inner: Arc::new(FramesetInner { frames, timestamp }),
        }
    }

    /// Capture instant shared by the bundled frames.
    pub fn timestamp(&self) -> Timestamp {
        self.inner.timestamp
    }

    pub fn len(&self) -> usize {
        self.inner.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.frames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.inner.frames.iter()
    }

    /// Frame for an exact stream identity, if present.
    pub fn frame(&self, key: StreamKey) -> Option<&Frame> {
        self.inner.frames.iter().find(|f| f.profile.key == key)
    }

    /// First frame of the given kind, any index.
    pub fn first_of(&self, kind: StreamKind) -> Option<&Frame> {
        self.inner.frames.iter().find(|f| f.profile.key.kind == kind)
    }
}

impl std::fmt::Debug for Frameset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frameset")
            .field("timestamp", &self.inner.timestamp)
            .field("frames", &self.inner.frames)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::profile::PixelFormat;

    fn depth_frame(n: u64) -> Frame {
        Frame {
            profile: StreamProfile::new(StreamKind::Depth, 0, 640, 480, PixelFormat::Z16, 30),
            data: Bytes::from_static(&[0u8; 16]),
            timestamp: Timestamp::from_micros(n as i64 * 33_333),
            frame_number: n,
        }
    }

    #[test]
    fn test_timestamp_diff() {
        let a = Timestamp::from_micros(1_000);
        let b = Timestamp::from_micros(4_000);
        assert_eq!(a.diff(b), Duration::from_micros(3_000));
        assert_eq!(b.diff(a), Duration::from_micros(3_000));
    }

    #[test]
    fn test_frameset_lookup() {
        let fs = Frameset::new(vec![depth_frame(7)], Timestamp::from_micros(0));
        assert_eq!(fs.len(), 1);
        let key = StreamKey::new(StreamKind::Depth, 0);
        assert_eq!(fs.frame(key).unwrap().frame_number, 7);
        assert!(fs.first_of(StreamKind::Color).is_none());
    }

    #[test]
    fn test_frameset_clone_shares_payload() {
        let fs = Frameset::new(vec![depth_frame(1)], Timestamp::from_micros(0));
        let copy = fs.clone();
        assert_eq!(copy.len(), fs.len());
        drop(fs);
        let key = StreamKey::new(StreamKind::Depth, 0);
        assert_eq!(copy.frame(key).unwrap().size(), 16);
    }
}
