//! Contract between the controller and the capture engine.

use super::error::RecorderError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;

/// Pending resolution of the playable audio after a recording stops.
///
/// Owns everything it needs, so it can be spawned while the engine stays with the controller.
pub type AudioJob = Pin<Box<dyn Future<Output = Result<AudioSrc, RecorderError>> + Send + 'static>>;

/// Discrete lifecycle events emitted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The device was acquired and samples are flowing
    Recording,
    /// Permission denied or device unavailable
    Blocked,
    /// Capture disallowed from the current context
    InsecureNotAllowed,
    /// An encoded file is available for export
    FileReady(FilePayload),
}

/// An encoded recording handed to the host for export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePayload {
    pub path: PathBuf,
    pub mime_type: String,
}

impl FilePayload {
    pub fn wav(path: PathBuf) -> Self {
        Self {
            path,
            mime_type: "audio/wav".to_string(),
        }
    }
}

/// URI of a playable recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSrc(String);

impl AudioSrc {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// Builds a `file://` URI, percent-encoding each path segment.
    pub fn from_path(path: &Path) -> Self {
        let encoded: Vec<String> = path
            .components()
            .filter_map(|component| match component {
                Component::Normal(segment) => {
                    Some(urlencoding::encode(&segment.to_string_lossy()).into_owned())
                }
                _ => None,
            })
            .collect();
        Self(format!("file:///{}", encoded.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AudioSrc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Imperative controls over the microphone and encoder.
///
/// `start` may complete asynchronously: permission outcomes arrive later as
/// [`EngineEvent`]s. An `Err` from `start` is an immediate refusal.
pub trait CaptureEngine {
    /// Whether capture is possible at all on this system.
    fn supported(&self) -> bool;

    /// Acquires the device or resumes a paused capture.
    fn start(&mut self) -> Result<(), RecorderError>;

    /// Pauses capture without losing samples.
    fn pause(&mut self);

    /// Stops capture; samples stay available for [`CaptureEngine::wav_url`].
    fn stop(&mut self);

    /// Instantaneous average signal level, 0-100.
    fn average_mic_frequency(&mut self) -> f32;

    /// Starts encoding the captured samples into a playable resource.
    fn wav_url(&mut self) -> AudioJob;

    /// Releases the microphone device.
    fn release_mic(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_src_from_path_encodes_segments() {
        let src = AudioSrc::from_path(Path::new("/tmp/my answer/take 1.wav"));
        assert_eq!(src.as_str(), "file:///tmp/my%20answer/take%201.wav");
    }

    #[test]
    fn test_file_payload_is_wav() {
        let payload = FilePayload::wav(PathBuf::from("/tmp/a.wav"));
        assert_eq!(payload.mime_type, "audio/wav");
    }
}
