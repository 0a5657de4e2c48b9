//! The audio recorder widget.
//!
//! A single controller owns the session state machine and talks to three
//! collaborators through narrow seams: a [`CaptureEngine`] for the microphone,
//! a [`ViewSink`] that receives batched view updates, and a [`Host`] that
//! persists state, re-measures layout, and receives exported files.

pub mod audio;
pub mod controller;
pub mod engine;
pub mod error;
pub mod host;
pub mod layout;
pub mod meter;
pub mod spectrum;
pub mod state;
pub mod status;
pub mod store;
pub mod view;

pub use audio::CpalEngine;
pub use controller::{ControllerSettings, Input, Intent, RecordingController};
pub use engine::{AudioJob, AudioSrc, CaptureEngine, EngineEvent, FilePayload};
pub use error::RecorderError;
pub use host::{ChannelHost, Completion, ExportOptions, Host, HostEvent, HostOptions, PlainTitle, TitleFormatter};
pub use layout::{DialogKind, DialogRef, LayoutThresholds, Viewport};
pub use state::{Epoch, PersistedViewState, RecordingState};
pub use status::{L10n, StatusMessageTable};
pub use store::StateStore;
pub use view::{LayoutOverrides, SessionView, ViewSink, ViewUpdate};
