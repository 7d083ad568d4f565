//! Pipeline state management

use std::time::Instant;

/// Pipeline state machine
///
/// Represents the current state of a pipeline. State transitions are
/// validated so every lifecycle operation observes a consistent view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No configuration has been resolved
    Unconfigured,

    /// A configuration is resolved against a device but sensors are closed
    Configured,

    /// Sensors are open and framesets are being delivered
    Streaming {
        /// When streaming started
        started_at: Instant,
    },
}

impl PipelineState {
    /// Check if this state transition is valid
    pub fn can_transition_to(&self, target: &PipelineState) -> bool {
        use PipelineState::*;

        match (self, target) {
            // open() resolves a configuration; re-resolution is always
            // permitted, implicitly stopping a live session first
            (_, Configured) => true,

            // start() requires a resolved configuration
            (Configured, Streaming { .. }) => true,

            // reset() is valid from any state
            (_, Unconfigured) => true,

            // Self-transition while streaming (restart) must go through
            // Configured
            _ => false,
        }
    }

    /// Get a human-readable description of this state
    pub fn description(&self) -> &'static str {
        match self {
            PipelineState::Unconfigured => "Unconfigured",
            PipelineState::Configured => "Configured",
            PipelineState::Streaming { .. } => "Streaming",
        }
    }

    /// Check if a configuration is currently held (resolved or streaming)
    pub fn is_configured(&self) -> bool {
        !matches!(self, PipelineState::Unconfigured)
    }

    /// Check if the pipeline is streaming
    pub fn is_streaming(&self) -> bool {
        matches!(self, PipelineState::Streaming { .. })
    }

    /// Get the duration since streaming started (if streaming)
    pub fn streaming_duration(&self) -> Option<std::time::Duration> {
        if let PipelineState::Streaming { started_at } = self {
            Some(started_at.elapsed())
        } else {
            None
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        let unconfigured = PipelineState::Unconfigured;
        let configured = PipelineState::Configured;
        let streaming = PipelineState::Streaming {
            started_at: Instant::now(),
        };

        // Valid transitions
        assert!(unconfigured.can_transition_to(&configured));
        assert!(configured.can_transition_to(&streaming));
        assert!(streaming.can_transition_to(&configured));
        assert!(streaming.can_transition_to(&unconfigured));
        assert!(configured.can_transition_to(&unconfigured));

        // Reconfiguration mid-stream is permitted
        assert!(streaming.can_transition_to(&configured));
    }

    #[test]
    fn test_invalid_transitions() {
        let unconfigured = PipelineState::Unconfigured;
        let streaming = PipelineState::Streaming {
            started_at: Instant::now(),
        };

        // Must resolve before streaming
        assert!(!unconfigured.can_transition_to(&streaming));
        // Restart must pass through Configured
        assert!(!streaming.can_transition_to(&PipelineState::Streaming {
            started_at: Instant::now(),
        }));
    }

    #[test]
    fn test_state_checks() {
        let unconfigured = PipelineState::Unconfigured;
        let configured = PipelineState::Configured;
        let streaming = PipelineState::Streaming {
            started_at: Instant::now(),
        };

        assert!(!unconfigured.is_configured());
        assert!(!unconfigured.is_streaming());

        assert!(configured.is_configured());
        assert!(!configured.is_streaming());

        assert!(streaming.is_configured());
        assert!(streaming.is_streaming());
        assert!(streaming.streaming_duration().is_some());
        assert!(configured.streaming_duration().is_none());
    }
}
