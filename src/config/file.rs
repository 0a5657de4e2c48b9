//! Configuration file management for arec.
//!
//! Loads and saves the application configuration as TOML in the user's config
//! directory. A missing file is created with defaults on first run.

use crate::recorder::{L10n, LayoutThresholds};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Content the recorder is attached to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Raw title; markup is stripped before display
    #[serde(default = "default_title")]
    pub title: String,
    /// Key for the persisted view state
    #[serde(default = "default_content_id")]
    pub content_id: String,
    /// Whether the recorder is embedded in another content type
    #[serde(default)]
    pub is_subcontent: bool,
}

fn default_title() -> String {
    "Audio Recorder".to_string()
}

fn default_content_id() -> String {
    "default".to_string()
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            content_id: default_content_id(),
            is_subcontent: false,
        }
    }
}

/// Audio capture configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Audio device to use. Options:
    /// - "default" for system default device
    /// - numeric index (0, 1, 2, etc.) from `arec list-devices`
    /// - device name from `arec list-devices`
    #[serde(default = "default_device")]
    pub device: String,
    /// Preferred sample rate in Hz; the device's native rate is used if it differs
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Reference level in dBFS for a full meter (typical: -20 to -6 dBFS)
    #[serde(default = "default_reference_level_db")]
    pub reference_level_db: i8,
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_reference_level_db() -> i8 {
    -20
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_sample_rate(),
            reference_level_db: default_reference_level_db(),
        }
    }
}

/// Level meter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterConfig {
    /// Delay between level samples while recording
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

fn default_frame_interval_ms() -> u64 {
    16
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: default_frame_interval_ms(),
        }
    }
}

impl MeterConfig {
    /// Frame interval, never shorter than one millisecond.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

/// Layout thresholds and the pixel size of one terminal cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_min_width")]
    pub min_width: u32,
    #[serde(default = "default_min_height")]
    pub min_height: u32,
    /// Pixels per terminal column
    #[serde(default = "default_cell_width")]
    pub cell_width: u32,
    /// Pixels per terminal row
    #[serde(default = "default_cell_height")]
    pub cell_height: u32,
}

fn default_min_width() -> u32 {
    480
}

fn default_min_height() -> u32 {
    200
}

fn default_cell_width() -> u32 {
    8
}

fn default_cell_height() -> u32 {
    16
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            min_width: default_min_width(),
            min_height: default_min_height(),
            cell_width: default_cell_width(),
            cell_height: default_cell_height(),
        }
    }
}

impl LayoutConfig {
    pub fn thresholds(&self) -> LayoutThresholds {
        LayoutThresholds {
            min_width: self.min_width,
            min_height: self.min_height,
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArecConfig {
    #[serde(default)]
    pub recorder: RecorderConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub meter: MeterConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub l10n: L10n,
}

impl ArecConfig {
    /// Loads configuration from the user's config directory, writing the
    /// defaults first if no config file exists yet.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the config file cannot be read or written
    /// - If the TOML is malformed
    pub fn load_or_create() -> Result<Self> {
        let config_path = get_config_path()?;
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(&config_path)?;
            tracing::info!("Created default config at {}", config_path.display());
            return Ok(config);
        }
        Self::load_from(&config_path)
    }

    /// Loads configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config {}: {e}", path.display()))?;
        let config = toml::from_str(&content)
            .map_err(|e| anyhow!("Invalid config {}: {e}", path.display()))?;
        Ok(config)
    }

    /// Saves configuration to the user's config directory.
    pub fn save(&self) -> Result<()> {
        self.save_to(&get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        tracing::info!("Configuration saved");
        Ok(())
    }
}

/// Retrieves the path to the config file, `~/.config/arec/arec.toml`.
///
/// # Errors
/// - If the home directory cannot be determined
/// - If the config directory cannot be created
pub fn get_config_path() -> Result<PathBuf> {
    let config_dir = dirs::home_dir()
        .ok_or_else(|| anyhow!("Could not determine home directory"))?
        .join(".config")
        .join("arec");

    fs::create_dir_all(&config_dir)
        .map_err(|e| anyhow!("Failed to create config directory: {e}"))?;

    Ok(config_dir.join("arec.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: ArecConfig = toml::from_str("").unwrap();
        assert_eq!(config, ArecConfig::default());
        assert_eq!(config.audio.device, "default");
        assert_eq!(config.meter.frame_interval(), Duration::from_millis(16));
        assert_eq!(config.layout.thresholds(), LayoutThresholds::default());
    }

    #[test]
    fn test_partial_sections() {
        let config: ArecConfig = toml::from_str(
            r#"
            [recorder]
            title = "<b>Describe</b> your day"

            [layout]
            min_width = 600

            [l10n]
            status_recording = "Aufnahme..."
            "#,
        )
        .unwrap();
        assert_eq!(config.recorder.title, "<b>Describe</b> your day");
        assert_eq!(config.recorder.content_id, "default");
        assert_eq!(config.layout.min_width, 600);
        assert_eq!(config.layout.min_height, 200);
        assert_eq!(config.l10n.status_recording, "Aufnahme...");
        assert_eq!(
            config.l10n.status_paused,
            L10n::default().status_paused
        );
    }

    #[test]
    fn test_zero_frame_interval_is_clamped() {
        let meter = MeterConfig {
            frame_interval_ms: 0,
        };
        assert_eq!(meter.frame_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/arec.toml");
        let mut config = ArecConfig::default();
        config.recorder.content_id = "lesson-7".to_string();
        config.audio.reference_level_db = -12;
        config.save_to(&path).unwrap();

        let loaded = ArecConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arec.toml");
        fs::write(&path, "[audio\nsample_rate = ").unwrap();
        assert!(ArecConfig::load_from(&path).is_err());
    }
}
