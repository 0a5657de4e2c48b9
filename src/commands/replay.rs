//! Replay an exported recording using the system audio player.

use crate::history::ExportHistory;
use crate::recorder::store::default_data_dir;
use std::process::Command;

/// Plays back an exported recording using the system's default audio player.
///
/// On macOS: Uses `open` command to open with default application
/// On Linux: Tries xdg-open first, then falls back to aplay, paplay, mpv or ffplay
///
/// # Arguments
/// * `export_index` - Export to play (1 = most recent, None = most recent)
pub fn handle_replay(export_index: Option<usize>) -> Result<(), anyhow::Error> {
    tracing::info!("=== arec Replay Command ===");

    let history = ExportHistory::new(&default_data_dir()?)?;
    let index = export_index.unwrap_or(1);
    let Some(export) = history.get(index)? else {
        let available = history.list()?.len();
        if available == 0 {
            return Err(anyhow::anyhow!("No exported recordings found"));
        }
        return Err(anyhow::anyhow!(
            "Export index out of range. Available exports: 1-{available}"
        ));
    };

    let audio_path = &export.audio_path;

    if !audio_path.exists() {
        return Err(anyhow::anyhow!(
            "Audio file not found: {}",
            audio_path.display()
        ));
    }

    tracing::info!(
        "Playing export #{} '{}' from {}",
        index,
        export.title,
        export.created_at.format("%Y-%m-%d %H:%M:%S")
    );

    // Platform-specific audio player invocation
    #[cfg(target_os = "macos")]
    {
        Command::new("open")
            .arg(audio_path)
            .spawn()
            .map_err(|e| anyhow::anyhow!("Failed to open audio player: {e}"))?
            .wait()
            .map_err(|e| anyhow::anyhow!("Audio player error: {e}"))?;
    }

    #[cfg(target_os = "linux")]
    {
        let result = Command::new("xdg-open")
            .arg(audio_path)
            .spawn();

        match result {
            Ok(mut child) => {
                child
                    .wait()
                    .map_err(|e| anyhow::anyhow!("Audio player error: {e}"))?;
            }
            Err(_) => {
                // Fallback to common audio players if xdg-open fails
                let players = ["aplay", "paplay", "mpv", "ffplay"];
                let mut played = false;

                for player in players {
                    if let Ok(mut child) = Command::new(player).arg(audio_path).spawn() {
                        let _ = child.wait();
                        played = true;
                        break;
                    }
                }

                if !played {
                    return Err(anyhow::anyhow!(
                        "No audio player found. Install aplay, paplay, mpv, or ffplay"
                    ));
                }
            }
        }
    }

    tracing::info!("Playback finished for export #{}", index);
    Ok(())
}
