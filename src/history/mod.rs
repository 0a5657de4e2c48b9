//! Exported recordings kept on disk for listing and replay.

pub mod exports;

pub use exports::{ExportHistory, ExportMetadata, MAX_EXPORTS};
