//! Recording states and the persisted view state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of states a recording session can be in.
///
/// Exactly one value is current at any time and only the
/// [`RecordingController`](super::RecordingController) assigns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RecordingState {
    /// The capture engine is not available on this system
    Unsupported,
    /// Waiting for the user to start recording
    #[default]
    Ready,
    /// Actively capturing audio
    Recording,
    /// Capture paused, samples kept
    Paused,
    /// Recording finished, audio being or already resolved
    Done,
    /// A previous session already finished; shown without touching the device
    Resume,
    /// Microphone permission denied or device unavailable
    Blocked,
    /// Capture is not allowed from this context
    InsecureNotAllowed,
    /// The playable audio file could not be produced
    CantCreateAudioFile,
}

impl RecordingState {
    /// Every state, in declaration order.
    pub const ALL: [RecordingState; 9] = [
        Self::Unsupported,
        Self::Ready,
        Self::Recording,
        Self::Paused,
        Self::Done,
        Self::Resume,
        Self::Blocked,
        Self::InsecureNotAllowed,
        Self::CantCreateAudioFile,
    ];

    /// Whether the state reflects an environment constraint rather than session progress.
    ///
    /// Retry is not offered from these states.
    pub fn is_environment_failure(self) -> bool {
        matches!(
            self,
            Self::Unsupported | Self::Blocked | Self::InsecureNotAllowed
        )
    }

    /// Whether a persisted value of this state means the previous session completed.
    pub fn indicates_completion(self) -> bool {
        matches!(self, Self::Done | Self::Resume)
    }
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unsupported => "unsupported",
            Self::Ready => "ready",
            Self::Recording => "recording",
            Self::Paused => "paused",
            Self::Done => "done",
            Self::Resume => "resume",
            Self::Blocked => "blocked",
            Self::InsecureNotAllowed => "insecure-not-allowed",
            Self::CantCreateAudioFile => "cant-create-audio-file",
        };
        write!(f, "{name}")
    }
}

/// The only state that survives across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedViewState {
    pub view_state: RecordingState,
}

/// Logical token identifying the state a piece of asynchronous work was started in.
///
/// Bumped on every transition; results carrying an older epoch are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Epoch(u64);

impl Epoch {
    pub fn next(self) -> Self {
        Epoch(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persisted_state_layout() {
        let state = PersistedViewState {
            view_state: RecordingState::InsecureNotAllowed,
        };
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"viewState":"insecure-not-allowed"}"#);

        let parsed: PersistedViewState = serde_json::from_str(r#"{"viewState":"done"}"#).unwrap();
        assert_eq!(parsed.view_state, RecordingState::Done);
    }

    #[test]
    fn test_display_matches_serialized_name() {
        for state in RecordingState::ALL {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{state}\""));
        }
    }

    #[test]
    fn test_environment_failures() {
        assert!(RecordingState::Blocked.is_environment_failure());
        assert!(RecordingState::Unsupported.is_environment_failure());
        assert!(RecordingState::InsecureNotAllowed.is_environment_failure());
        assert!(!RecordingState::CantCreateAudioFile.is_environment_failure());
        assert!(!RecordingState::Done.is_environment_failure());
    }

    #[test]
    fn test_epoch_advances() {
        let first = Epoch::default();
        assert_ne!(first, first.next());
        assert_eq!(first.next(), first.next());
    }
}
