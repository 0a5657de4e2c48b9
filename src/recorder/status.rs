//! Localized status messages for each recording state.

use super::state::RecordingState;
use serde::{Deserialize, Serialize};

/// Localization strings supplied by the host.
///
/// Any field left out of the config file falls back to the English default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct L10n {
    pub status_ready_to_record: String,
    pub status_recording: String,
    pub status_paused: String,
    pub status_finished_recording: String,
    pub status_resumed: String,
    pub microphone_not_supported: String,
    pub microphone_inaccessible: String,
    pub insecure_not_allowed: String,
    pub status_cant_create_the_audio_file: String,
    /// Description attached to the completion notification
    pub completed_description: String,
    pub confirm_finish: String,
    pub confirm_retry: String,
}

impl Default for L10n {
    fn default() -> Self {
        Self {
            status_ready_to_record: "Press space to record your answer.".to_string(),
            status_recording: "Recording...".to_string(),
            status_paused: "Recording paused. Press space to continue recording.".to_string(),
            status_finished_recording:
                "You have successfully recorded your answer! The recording is ready below."
                    .to_string(),
            status_resumed:
                "You have already recorded an answer. Press r to record a new one.".to_string(),
            microphone_not_supported:
                "Microphone not supported. No audio input devices could be enumerated on this system."
                    .to_string(),
            microphone_inaccessible:
                "Microphone is not accessible. Make sure the input device is connected and not in use."
                    .to_string(),
            insecure_not_allowed:
                "Access to the microphone is not allowed from this context.".to_string(),
            status_cant_create_the_audio_file: "Can't create the audio file.".to_string(),
            completed_description: "Audio recording completed".to_string(),
            confirm_finish: "Finish the recording?".to_string(),
            confirm_retry: "Discard this recording and start over?".to_string(),
        }
    }
}

/// Immutable mapping from state to display string, built once at construction.
///
/// Blank overrides fall back to the English default, so every state always
/// has a message.
#[derive(Debug, Clone)]
pub struct StatusMessageTable {
    unsupported: String,
    ready: String,
    recording: String,
    paused: String,
    done: String,
    resume: String,
    blocked: String,
    insecure_not_allowed: String,
    cant_create_audio_file: String,
}

impl StatusMessageTable {
    pub fn new(l10n: &L10n) -> Self {
        let defaults = L10n::default();
        let pick = |text: &str, fallback: &str| {
            if text.trim().is_empty() {
                tracing::warn!("Empty status message in config; using \"{}\"", fallback);
                fallback.to_string()
            } else {
                text.to_string()
            }
        };

        Self {
            unsupported: pick(
                &l10n.microphone_not_supported,
                &defaults.microphone_not_supported,
            ),
            ready: pick(&l10n.status_ready_to_record, &defaults.status_ready_to_record),
            recording: pick(&l10n.status_recording, &defaults.status_recording),
            paused: pick(&l10n.status_paused, &defaults.status_paused),
            done: pick(
                &l10n.status_finished_recording,
                &defaults.status_finished_recording,
            ),
            resume: pick(&l10n.status_resumed, &defaults.status_resumed),
            blocked: pick(
                &l10n.microphone_inaccessible,
                &defaults.microphone_inaccessible,
            ),
            insecure_not_allowed: pick(
                &l10n.insecure_not_allowed,
                &defaults.insecure_not_allowed,
            ),
            cant_create_audio_file: pick(
                &l10n.status_cant_create_the_audio_file,
                &defaults.status_cant_create_the_audio_file,
            ),
        }
    }

    /// Returns the status message for `state`.
    pub fn status(&self, state: RecordingState) -> &str {
        match state {
            RecordingState::Unsupported => &self.unsupported,
            RecordingState::Ready => &self.ready,
            RecordingState::Recording => &self.recording,
            RecordingState::Paused => &self.paused,
            RecordingState::Done => &self.done,
            RecordingState::Resume => &self.resume,
            RecordingState::Blocked => &self.blocked,
            RecordingState::InsecureNotAllowed => &self.insecure_not_allowed,
            RecordingState::CantCreateAudioFile => &self.cant_create_audio_file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_state_has_a_message() {
        let table = StatusMessageTable::new(&L10n::default());
        for state in RecordingState::ALL {
            assert!(!table.status(state).is_empty(), "missing message for {state}");
        }
    }

    #[test]
    fn test_messages_come_from_l10n() {
        let l10n = L10n {
            status_recording: "Aufnahme läuft".to_string(),
            ..L10n::default()
        };
        let table = StatusMessageTable::new(&l10n);
        assert_eq!(table.status(RecordingState::Recording), "Aufnahme läuft");
        assert_eq!(
            table.status(RecordingState::Blocked),
            L10n::default().microphone_inaccessible
        );
    }

    #[test]
    fn test_partial_l10n_from_toml() {
        let l10n: L10n = toml::from_str(r#"status_paused = "Pausiert""#).unwrap();
        assert_eq!(l10n.status_paused, "Pausiert");
        assert_eq!(l10n.status_ready_to_record, L10n::default().status_ready_to_record);
    }

    #[test]
    fn test_blank_override_falls_back_to_default() {
        let l10n: L10n = toml::from_str(
            r#"
status_recording = ""
status_paused = "   "
status_finished_recording = "Fertig"
"#,
        )
        .unwrap();
        let table = StatusMessageTable::new(&l10n);
        assert_eq!(
            table.status(RecordingState::Recording),
            L10n::default().status_recording
        );
        assert_eq!(
            table.status(RecordingState::Paused),
            L10n::default().status_paused
        );
        assert_eq!(table.status(RecordingState::Done), "Fertig");
        for state in RecordingState::ALL {
            assert!(!table.status(state).is_empty(), "missing message for {state}");
        }
    }
}
