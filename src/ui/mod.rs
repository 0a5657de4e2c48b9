//! Terminal UI components.

pub mod error;
pub mod meter;
pub mod recorder;

pub use error::{report_fatal, ErrorScreen};
pub use recorder::{CellScale, EventReader, KeyAction, RecorderScreen, RecorderTui, TerminalEvent};
