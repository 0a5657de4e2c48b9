//! On-disk persistence of the recorder's cross-session state.
//!
//! One small JSON file per content id, e.g. `{"viewState":"done"}`.

use super::state::PersistedViewState;
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Stores [`PersistedViewState`] keyed by content id.
pub struct StateStore {
    state_dir: PathBuf,
}

impl StateStore {
    /// Creates a store rooted at `<data_dir>/state`.
    pub fn new(data_dir: &Path) -> Result<Self> {
        let state_dir = data_dir.join("state");
        fs::create_dir_all(&state_dir)?;
        Ok(Self { state_dir })
    }

    /// Store under the user's data directory (`~/.local/share/arec`).
    pub fn open_default() -> Result<Self> {
        Self::new(&default_data_dir()?)
    }

    fn path_for(&self, content_id: &str) -> PathBuf {
        let safe: String = content_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let name = if safe.is_empty() { "default" } else { &safe };
        self.state_dir.join(format!("{name}.json"))
    }

    /// Returns the saved state, or `None` if nothing was saved or it cannot be parsed.
    pub fn load(&self, content_id: &str) -> Result<Option<PersistedViewState>> {
        let path = self.path_for(content_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        match serde_json::from_str(&content) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                tracing::warn!("Ignoring unreadable state file {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    pub fn save(&self, content_id: &str, state: &PersistedViewState) -> Result<()> {
        let path = self.path_for(content_id);
        fs::write(&path, serde_json::to_string(state)?)?;
        tracing::debug!("Persisted {} to {}", state.view_state, path.display());
        Ok(())
    }

    /// Removes saved state. Returns whether anything was removed.
    pub fn clear(&self, content_id: &str) -> Result<bool> {
        let path = self.path_for(content_id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        tracing::info!("Cleared persisted state for '{}'", content_id);
        Ok(true)
    }
}

/// `~/.local/share/arec`, or the platform equivalent.
pub fn default_data_dir() -> Result<PathBuf> {
    let dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?
        .join("arec");
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::state::RecordingState;

    #[test]
    fn test_load_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path()).unwrap();
        assert!(store.load("lesson-1").unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path()).unwrap();
        let state = PersistedViewState {
            view_state: RecordingState::Done,
        };
        store.save("lesson-1", &state).unwrap();

        let raw = fs::read_to_string(dir.path().join("state/lesson-1.json")).unwrap();
        assert_eq!(raw, r#"{"viewState":"done"}"#);
        assert_eq!(store.load("lesson-1").unwrap(), Some(state));
        assert!(store.load("lesson-2").unwrap().is_none());
    }

    #[test]
    fn test_content_id_is_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path()).unwrap();
        let state = PersistedViewState {
            view_state: RecordingState::Paused,
        };
        store.save("../escape/me", &state).unwrap();
        assert!(dir.path().join("state/___escape_me.json").exists());
        assert_eq!(store.load("../escape/me").unwrap(), Some(state));
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path()).unwrap();
        fs::write(dir.path().join("state/x.json"), "not json").unwrap();
        assert!(store.load("x").unwrap().is_none());
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path()).unwrap();
        assert!(!store.clear("x").unwrap());
        store
            .save(
                "x",
                &PersistedViewState {
                    view_state: RecordingState::Recording,
                },
            )
            .unwrap();
        assert!(store.clear("x").unwrap());
        assert!(store.load("x").unwrap().is_none());
    }
}
