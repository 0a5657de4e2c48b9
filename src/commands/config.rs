//! `arec config`: edit the recorder configuration.
//!
//! Makes sure `arec.toml` exists, hands it to the user's editor, then reloads it
//! and prints the settings the next recording session will use.

use crate::config::{get_config_path, ArecConfig};
use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

/// Editors tried when neither `$VISUAL` nor `$EDITOR` is set.
const FALLBACK_EDITORS: [&str; 2] = ["nano", "vi"];

/// Opens `arec.toml` in an editor and validates the result.
///
/// An invalid file is reported but left in place, so the user can fix it
/// with another `arec config`.
///
/// # Errors
/// - If the config file cannot be created
/// - If no editor could be launched, or the editor fails
pub fn handle_config() -> anyhow::Result<()> {
    if let Err(e) = ArecConfig::load_or_create() {
        tracing::warn!("Existing config is invalid, opening it anyway: {}", e);
    }
    let config_path = get_config_path()?;

    let candidates = editor_candidates(
        std::env::var("VISUAL").ok().as_deref(),
        std::env::var("EDITOR").ok().as_deref(),
    );
    run_editor(&candidates, &config_path)?;

    match ArecConfig::load_from(&config_path) {
        Ok(config) => {
            tracing::info!("Config updated: {}", config_path.display());
            println!("{}", summarize(&config));
        }
        Err(e) => {
            tracing::warn!("Edited config is invalid: {}", e);
            println!("Warning: {e}");
            println!("The recorder will refuse to start until this is fixed.");
        }
    }
    Ok(())
}

/// Editor commands to try, in order. A configured editor may carry arguments
/// (`code --wait`).
fn editor_candidates(visual: Option<&str>, editor: Option<&str>) -> Vec<Vec<String>> {
    let configured = [visual, editor]
        .into_iter()
        .flatten()
        .map(|value| {
            value
                .split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|command| !command.is_empty());

    configured
        .chain(FALLBACK_EDITORS.iter().map(|name| vec![name.to_string()]))
        .collect()
}

/// Launches the first candidate that exists and waits for it to exit.
fn run_editor(candidates: &[Vec<String>], path: &Path) -> anyhow::Result<()> {
    for command in candidates {
        let Some((program, args)) = command.split_first() else {
            continue;
        };
        tracing::debug!("Trying editor: {}", command.join(" "));

        match Command::new(program).args(args).arg(path).status() {
            Ok(status) if status.success() => return Ok(()),
            Ok(status) => {
                return Err(anyhow::anyhow!(
                    "Editor '{program}' exited with error code: {}",
                    status.code().unwrap_or(-1)
                ))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(anyhow::anyhow!("Failed to launch editor '{program}': {e}")),
        }
    }

    Err(anyhow::anyhow!(
        "No editor found. Set $VISUAL or $EDITOR, or edit {} directly.",
        path.display()
    ))
}

fn summarize(config: &ArecConfig) -> String {
    format!(
        "Recorder \"{}\" (content id: {})\n\
         Input: {} at {} Hz, full scale at {} dBFS\n\
         Meter: every {} ms\n\
         Narrow layout below {}x{} px",
        config.recorder.title,
        config.recorder.content_id,
        config.audio.device,
        config.audio.sample_rate,
        config.audio.reference_level_db,
        config.meter.frame_interval().as_millis(),
        config.layout.min_width,
        config.layout.min_height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editor_candidates_order() {
        let candidates = editor_candidates(Some("code --wait"), Some("vim"));
        assert_eq!(
            candidates,
            vec![
                vec!["code".to_string(), "--wait".to_string()],
                vec!["vim".to_string()],
                vec!["nano".to_string()],
                vec!["vi".to_string()],
            ]
        );
    }

    #[test]
    fn test_blank_editor_variables_are_skipped() {
        let candidates = editor_candidates(Some("  "), None);
        assert_eq!(candidates, vec![vec!["nano".to_string()], vec!["vi".to_string()]]);
    }

    #[test]
    fn test_missing_editors_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arec.toml");
        let candidates = vec![vec!["arec-no-such-editor-1".to_string()], Vec::new()];
        let err = run_editor(&candidates, &path).unwrap_err();
        assert!(err.to_string().contains("No editor found"));
    }

    #[test]
    fn test_summary_mentions_effective_settings() {
        let summary = summarize(&ArecConfig::default());
        assert!(summary.contains("Audio Recorder"));
        assert!(summary.contains("16000 Hz"));
        assert!(summary.contains("480x200"));
    }
}
