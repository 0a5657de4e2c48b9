//! Export history for finished recordings.
//!
//! Every exported WAV is copied into the data directory together with a JSON
//! metadata file, so recordings survive the temporary capture file and can be
//! listed or replayed later.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Number of exports kept on disk.
pub const MAX_EXPORTS: usize = 10;

/// Metadata about one exported recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// Unique identifier, the export timestamp in milliseconds
    pub id: String,
    /// Display title of the recording
    pub title: String,
    /// Path to the exported audio file
    pub audio_path: PathBuf,
    pub mime_type: String,
    /// Content instance the recording belongs to
    pub content_id: String,
    pub created_at: DateTime<Local>,
}

/// Manages the exports directory.
pub struct ExportHistory {
    exports_dir: PathBuf,
}

impl ExportHistory {
    /// Creates an export history rooted at `<data_dir>/exports`.
    pub fn new(data_dir: &Path) -> Result<Self> {
        let exports_dir = data_dir.join("exports");
        fs::create_dir_all(&exports_dir)?;
        Ok(Self { exports_dir })
    }

    /// Copies `source` into the exports directory as `<id>/<filename>` and
    /// records its metadata.
    ///
    /// Keeps only the 10 most recent exports; the oldest is removed first.
    pub fn save_export(
        &self,
        source: &Path,
        filename: &str,
        title: &str,
        mime_type: &str,
        content_id: &str,
    ) -> Result<ExportMetadata> {
        if !source.exists() {
            return Err(anyhow!("Export source not found: {}", source.display()));
        }
        self.cleanup_old_exports()?;

        let now = Local::now();
        let mut stamp = now.timestamp_millis();
        while self.metadata_path(&stamp.to_string()).exists() {
            stamp += 1;
        }
        let id = stamp.to_string();

        let target_dir = self.exports_dir.join(&id);
        fs::create_dir_all(&target_dir)?;
        let audio_path = target_dir.join(filename);
        fs::copy(source, &audio_path)?;

        let metadata = ExportMetadata {
            id: id.clone(),
            title: title.to_string(),
            audio_path,
            mime_type: mime_type.to_string(),
            content_id: content_id.to_string(),
            created_at: now,
        };
        fs::write(
            self.metadata_path(&id),
            serde_json::to_string_pretty(&metadata)?,
        )?;
        tracing::info!(
            "Exported recording {} to {}",
            id,
            metadata.audio_path.display()
        );

        Ok(metadata)
    }

    fn metadata_path(&self, id: &str) -> PathBuf {
        self.exports_dir.join(format!("{id}.json"))
    }

    /// Reads every metadata file, newest first. Unreadable entries are skipped.
    fn read_all(&self) -> Result<Vec<(PathBuf, ExportMetadata)>> {
        let mut exports: Vec<(PathBuf, ExportMetadata)> = fs::read_dir(&self.exports_dir)?
            .filter_map(|entry| {
                let path = entry.ok()?.path();
                if path.extension().is_some_and(|ext| ext == "json") {
                    let content = fs::read_to_string(&path).ok()?;
                    let meta: ExportMetadata = serde_json::from_str(&content).ok()?;
                    Some((path, meta))
                } else {
                    None
                }
            })
            .collect();
        exports.sort_by(|a, b| {
            b.1.created_at
                .cmp(&a.1.created_at)
                .then_with(|| b.1.id.cmp(&a.1.id))
        });
        Ok(exports)
    }

    /// Removes the oldest exports so that one more fits under the limit.
    fn cleanup_old_exports(&self) -> Result<()> {
        let exports = self.read_all()?;
        for (metadata_path, meta) in exports.iter().skip(MAX_EXPORTS - 1) {
            let audio_dir = self.exports_dir.join(&meta.id);
            if audio_dir.exists() {
                if let Err(e) = fs::remove_dir_all(&audio_dir) {
                    tracing::warn!("Failed to delete old export audio: {}", e);
                }
            }
            match fs::remove_file(metadata_path) {
                Ok(()) => tracing::info!("Deleted old export {}", meta.id),
                Err(e) => tracing::warn!("Failed to delete old export metadata: {}", e),
            }
        }
        Ok(())
    }

    /// All exports ordered by most recent first.
    pub fn list(&self) -> Result<Vec<ExportMetadata>> {
        Ok(self.read_all()?.into_iter().map(|(_, meta)| meta).collect())
    }

    /// Export by 1-based index, 1 being the most recent.
    pub fn get(&self, index: usize) -> Result<Option<ExportMetadata>> {
        if index == 0 {
            return Ok(None);
        }
        Ok(self.list()?.into_iter().nth(index - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_file(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"RIFF....WAVE").unwrap();
        path
    }

    #[test]
    fn test_save_copies_audio_and_metadata() {
        let data = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let history = ExportHistory::new(data.path()).unwrap();
        let source = source_file(scratch.path(), "arec_1.wav");

        let meta = history
            .save_export(&source, "my-answer.wav", "My Answer", "audio/wav", "lesson-1")
            .unwrap();

        assert!(meta.audio_path.ends_with("my-answer.wav"));
        assert_eq!(fs::read(&meta.audio_path).unwrap(), b"RIFF....WAVE");
        assert!(source.exists());
        assert_eq!(history.list().unwrap(), vec![meta]);
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let data = tempfile::tempdir().unwrap();
        let history = ExportHistory::new(data.path()).unwrap();
        assert!(history
            .save_export(Path::new("/nonexistent/x.wav"), "x.wav", "x", "audio/wav", "c")
            .is_err());
        assert!(history.list().unwrap().is_empty());
    }

    #[test]
    fn test_keeps_only_most_recent_exports() {
        let data = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let history = ExportHistory::new(data.path()).unwrap();
        let source = source_file(scratch.path(), "take.wav");

        let mut saved = Vec::new();
        for i in 0..MAX_EXPORTS + 2 {
            let meta = history
                .save_export(&source, "take.wav", &format!("Take {i}"), "audio/wav", "c")
                .unwrap();
            saved.push(meta);
        }

        let listed = history.list().unwrap();
        assert_eq!(listed.len(), MAX_EXPORTS);
        assert_eq!(listed[0].title, format!("Take {}", MAX_EXPORTS + 1));
        assert!(!saved[0].audio_path.exists());
        assert!(!saved[1].audio_path.exists());
        assert!(saved[2].audio_path.exists());
    }

    #[test]
    fn test_get_by_index() {
        let data = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let history = ExportHistory::new(data.path()).unwrap();
        let source = source_file(scratch.path(), "take.wav");

        history.save_export(&source, "a.wav", "First", "audio/wav", "c").unwrap();
        history.save_export(&source, "b.wav", "Second", "audio/wav", "c").unwrap();

        assert_eq!(history.get(1).unwrap().unwrap().title, "Second");
        assert_eq!(history.get(2).unwrap().unwrap().title, "First");
        assert!(history.get(0).unwrap().is_none());
        assert!(history.get(3).unwrap().is_none());
    }
}
