//! Reactive projection of the session consumed by the renderer.
//!
//! The controller never mutates the view directly. It sends batches of
//! [`ViewUpdate`]s through a [`ViewSink`]; each batch is applied as a unit so
//! the renderer never observes half a transition.

use super::engine::AudioSrc;
use super::state::RecordingState;
use tokio::sync::mpsc::UnboundedSender;

/// Number of title characters kept in the derived filename.
pub const FILENAME_TITLE_CHARS: usize = 20;
pub const FILENAME_EXTENSION: &str = ".wav";
const FALLBACK_FILENAME_STEM: &str = "recording";

/// Derives the download filename from the title.
///
/// Takes the first 20 characters, lower-cases them and turns spaces into hyphens.
pub fn audio_filename(title: &str) -> String {
    let stem: String = title
        .chars()
        .take(FILENAME_TITLE_CHARS)
        .collect::<String>()
        .to_lowercase()
        .replace(' ', "-");

    if stem.is_empty() {
        format!("{FALLBACK_FILENAME_STEM}{FILENAME_EXTENSION}")
    } else {
        format!("{stem}{FILENAME_EXTENSION}")
    }
}

/// Presentation overrides applied while the dialog is in narrow view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutOverrides {
    /// Dialog pinned to the top of the container instead of centered
    pub pinned: bool,
    /// Container scrolling disabled
    pub scroll_suppressed: bool,
}

impl LayoutOverrides {
    pub const NARROW: LayoutOverrides = LayoutOverrides {
        pinned: true,
        scroll_suppressed: true,
    };
}

/// One field update sent from the controller to the view.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewUpdate {
    Title(String),
    /// State and its status message always travel together
    State {
        state: RecordingState,
        status: String,
    },
    AudioSrc(Option<AudioSrc>),
    AudioFilename(String),
    AvgMicFrequency(f32),
    IsSubcontent(bool),
    Layout(LayoutOverrides),
}

/// Receives update batches from the controller.
pub trait ViewSink {
    fn apply(&mut self, batch: Vec<ViewUpdate>);
}

impl ViewSink for UnboundedSender<Vec<ViewUpdate>> {
    fn apply(&mut self, batch: Vec<ViewUpdate>) {
        if self.send(batch).is_err() {
            tracing::debug!("View receiver dropped; discarding update batch");
        }
    }
}

/// Data read by the rendering layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionView {
    pub title: String,
    pub state: RecordingState,
    pub status: String,
    pub audio_src: Option<AudioSrc>,
    pub audio_filename: String,
    pub avg_mic_frequency: f32,
    pub is_subcontent: bool,
    pub layout: LayoutOverrides,
}

impl SessionView {
    /// Applies a batch of updates in order.
    pub fn reduce(&mut self, batch: Vec<ViewUpdate>) {
        for update in batch {
            match update {
                ViewUpdate::Title(title) => self.title = title,
                ViewUpdate::State { state, status } => {
                    self.state = state;
                    self.status = status;
                    if state != RecordingState::Recording {
                        self.avg_mic_frequency = 0.0;
                    }
                }
                ViewUpdate::AudioSrc(src) => self.audio_src = src,
                ViewUpdate::AudioFilename(name) => self.audio_filename = name,
                ViewUpdate::AvgMicFrequency(level) => self.avg_mic_frequency = level,
                ViewUpdate::IsSubcontent(flag) => self.is_subcontent = flag,
                ViewUpdate::Layout(overrides) => self.layout = overrides,
            }
        }
    }

    pub fn is_narrow(&self) -> bool {
        self.layout.pinned
    }
}

impl ViewSink for SessionView {
    fn apply(&mut self, batch: Vec<ViewUpdate>) {
        self.reduce(batch);
    }
}
