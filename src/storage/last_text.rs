//! Last extracted text persistence

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const FILE_NAME: &str = "last_text.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Stored {
    #[serde(rename = "lastExtractedText", default)]
    last_extracted_text: String,
}

/// Keeps the most recent non-empty text across runs
#[derive(Debug, Clone)]
pub struct LastTextStore {
    path: PathBuf,
}

impl LastTextStore {
    /// Store in the application data directory
    pub fn new() -> Result<Self> {
        Ok(Self::in_dir(&super::get_data_dir()?))
    }

    /// Store inside a specific directory
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored text; empty if nothing was saved yet
    pub fn load(&self) -> Result<String> {
        if !self.path.exists() {
            return Ok(String::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let stored: Stored = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        Ok(stored.last_extracted_text)
    }

    /// Replace the stored text
    pub fn save(&self, text: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let stored = Stored {
            last_extracted_text: text.to_string(),
        };
        let content = serde_json::to_string_pretty(&stored)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        debug!("Saved {} characters to {:?}", text.chars().count(), self.path);
        Ok(())
    }

    /// Remove the stored text
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let store = LastTextStore::in_dir(dir.path());
        assert_eq!(store.load().unwrap(), "");
    }

    #[test]
    fn test_save_load_clear() {
        let dir = tempdir().unwrap();
        let store = LastTextStore::in_dir(dir.path());

        store.save("Subtitle line\nsecond line").unwrap();
        assert_eq!(store.load().unwrap(), "Subtitle line\nsecond line");

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["lastExtractedText"], "Subtitle line\nsecond line");

        store.clear().unwrap();
        assert!(!store.path().exists());
        assert_eq!(store.load().unwrap(), "");
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let store = LastTextStore::in_dir(dir.path());
        std::fs::write(store.path(), "not json").unwrap();
        assert!(store.load().is_err());
    }
}
