//! Failure taxonomy for a recording attempt.

use super::state::RecordingState;
use thiserror::Error;

/// Errors raised by the capture engine.
///
/// None of them cross the controller boundary: each one becomes a state transition
/// plus a logged diagnostic.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecorderError {
    /// Capture capability is absent on this system
    #[error("audio capture is not supported")]
    Unsupported,
    /// Permission denied or the input device is unavailable
    #[error("microphone blocked: {0}")]
    DeviceBlocked(String),
    /// Capture is disallowed from the current context
    #[error("microphone access is not allowed from an insecure context")]
    InsecureContext,
    /// The playable audio could not be produced
    #[error("failed to create audio file: {0}")]
    EncodingFailure(String),
}

impl RecorderError {
    /// The state a session moves to when this error surfaces.
    pub fn state(&self) -> RecordingState {
        match self {
            Self::Unsupported => RecordingState::Unsupported,
            Self::DeviceBlocked(_) => RecordingState::Blocked,
            Self::InsecureContext => RecordingState::InsecureNotAllowed,
            Self::EncodingFailure(_) => RecordingState::CantCreateAudioFile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_map_to_terminal_states() {
        assert_eq!(RecorderError::Unsupported.state(), RecordingState::Unsupported);
        assert_eq!(
            RecorderError::DeviceBlocked("busy".into()).state(),
            RecordingState::Blocked
        );
        assert_eq!(
            RecorderError::InsecureContext.state(),
            RecordingState::InsecureNotAllowed
        );
        assert_eq!(
            RecorderError::EncodingFailure("disk full".into()).state(),
            RecordingState::CantCreateAudioFile
        );
    }

    #[test]
    fn test_error_messages() {
        let err = RecorderError::EncodingFailure("no samples captured".into());
        assert_eq!(err.to_string(), "failed to create audio file: no samples captured");
    }
}
