//! Declarative pipeline configuration.
//!
//! A [`PipelineConfig`] accumulates stream requests and an optional device
//! selector (serial, playback file, or record file). Validation of the
//! mutually-exclusive and duplicate cases happens at accumulation time, so
//! misuse is reported before resolution is ever attempted.

use std::path::{Path, PathBuf};

use crate::device::profile::{PixelFormat, StreamKey, StreamKind};
use crate::error::{PipelineError, Result};

/// One declared stream constraint. Every field except the stream identity
/// may be left unspecified and acts as a wildcard during selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    pub key: StreamKey,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: Option<PixelFormat>,
    pub fps: Option<u32>,
}

impl StreamRequest {
    /// Request a stream by identity only; all fields wildcard.
    pub fn any(kind: StreamKind, index: u32) -> Self {
        Self {
            key: StreamKey::new(kind, index),
            width: None,
            height: None,
            format: None,
            fps: None,
        }
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_format(mut self, format: PixelFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = Some(fps);
        self
    }
}

/// Accumulated stream requests plus device/file constraints.
///
/// Immutable once committed to a session: `Pipeline::open` clones the
/// config, and later edits only affect the next resolution.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    requests: Vec<StreamRequest>,
    device_serial: Option<String>,
    playback_file: Option<PathBuf>,
    record_file: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stream request. A second request for the same
    /// (kind, index) is rejected rather than overridden.
    pub fn enable_stream(&mut self, request: StreamRequest) -> Result<()> {
        if self.requests.iter().any(|r| r.key == request.key) {
            return Err(PipelineError::ConflictingConfig(format!(
                "stream {} already requested",
                request.key
            )));
        }
        self.requests.push(request);
        Ok(())
    }

    /// Restrict resolution to the device with the given serial.
    pub fn enable_device(&mut self, serial: impl Into<String>) {
        self.device_serial = Some(serial.into());
    }

    /// Replace live devices with a file-backed playback device.
    pub fn enable_device_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        if self.record_file.is_some() {
            return Err(PipelineError::ConflictingConfig(
                "cannot enable playback while recording is enabled".into(),
            ));
        }
        self.playback_file = Some(path.as_ref().to_path_buf());
        Ok(())
    }

    /// Record every delivered frame to the given file.
    pub fn enable_record_to_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        if self.playback_file.is_some() {
            return Err(PipelineError::ConflictingConfig(
                "cannot enable recording while playback is enabled".into(),
            ));
        }
        self.record_file = Some(path.as_ref().to_path_buf());
        Ok(())
    }

    /// Clear all stream requests and device/file constraints.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn requests(&self) -> &[StreamRequest] {
        &self.requests
    }

    pub fn device_serial(&self) -> Option<&str> {
        self.device_serial.as_deref()
    }

    pub fn playback_file(&self) -> Option<&Path> {
        self.playback_file.as_deref()
    }

    pub fn record_file(&self) -> Option<&Path> {
        self.record_file.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_stream_rejected() {
        let mut config = PipelineConfig::new();
        config
            .enable_stream(StreamRequest::any(StreamKind::Depth, 0))
            .unwrap();
        let err = config
            .enable_stream(StreamRequest::any(StreamKind::Depth, 0).with_fps(60))
            .unwrap_err();
        assert!(matches!(err, PipelineError::ConflictingConfig(_)));
        // Same kind, different index is fine
        config
            .enable_stream(StreamRequest::any(StreamKind::Depth, 1))
            .unwrap();
        assert_eq!(config.requests().len(), 2);
    }

    #[test]
    fn test_record_and_playback_are_exclusive() {
        let mut config = PipelineConfig::new();
        config.enable_record_to_file("session.dcast").unwrap();
        let err = config.enable_device_from_file("session.dcast").unwrap_err();
        assert!(matches!(err, PipelineError::ConflictingConfig(_)));

        let mut config = PipelineConfig::new();
        config.enable_device_from_file("session.dcast").unwrap();
        let err = config.enable_record_to_file("other.dcast").unwrap_err();
        assert!(matches!(err, PipelineError::ConflictingConfig(_)));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut config = PipelineConfig::new();
        config
            .enable_stream(StreamRequest::any(StreamKind::Color, 0))
            .unwrap();
        config.enable_device("1234");
        config.enable_record_to_file("session.dcast").unwrap();
        config.reset();
        assert!(config.requests().is_empty());
        assert!(config.device_serial().is_none());
        assert!(config.record_file().is_none());
        // After reset, playback may be enabled again
        config.enable_device_from_file("session.dcast").unwrap();
    }
}
