//! Configuration management for arec.
//!
//! Configuration is a single TOML file in the user's config directory.

pub mod file;

pub use file::{get_config_path, ArecConfig, AudioConfig, LayoutConfig, MeterConfig, RecorderConfig};
