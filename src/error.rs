//! Error taxonomy for pipeline operations.
//!
//! Every public pipeline operation reports failure through [`PipelineError`].
//! Resolution and selection errors are surfaced synchronously by `open`/
//! `start`, never deferred to frame delivery.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// No connected device matches the configured constraints
    /// (serial filter, or an empty registry).
    #[error("no matching device: {0}")]
    NoMatchingDevice(String),

    /// No profile combination on any candidate device satisfies the
    /// declared stream requests. Resolution is all-or-nothing.
    #[error("unsatisfiable stream request: {0}")]
    UnsatisfiableRequest(String),

    /// The playback file could not be opened or parsed.
    #[error("playback file error: {0}")]
    PlaybackFile(String),

    /// The record file could not be created or written.
    #[error("record file error: {0}")]
    RecordFile(String),

    /// The operation is not valid in the current pipeline state.
    #[error("invalid pipeline state: {0}")]
    InvalidState(String),

    /// `wait_for_frames` exceeded its deadline. Recoverable: retry the wait.
    #[error("timed out after {0} ms waiting for frames")]
    Timeout(u64),

    /// Mutually exclusive configuration (record vs playback, duplicate
    /// stream request). Caller misuse, never retried internally.
    #[error("conflicting configuration: {0}")]
    ConflictingConfig(String),

    /// A device driver failed while opening or closing streams.
    #[error(transparent)]
    Device(#[from] anyhow::Error),
}

impl PipelineError {
    /// Whether retrying the same call can succeed without reconfiguring.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PipelineError::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_recoverable() {
        assert!(PipelineError::Timeout(100).is_recoverable());
        assert!(!PipelineError::InvalidState("stopped".into()).is_recoverable());
        assert!(!PipelineError::ConflictingConfig("duplicate".into()).is_recoverable());
    }

    #[test]
    fn test_device_error_from_anyhow() {
        let err: PipelineError = anyhow::anyhow!("sensor gone").into();
        assert!(matches!(err, PipelineError::Device(_)));
    }
}
