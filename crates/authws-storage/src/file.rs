//! JSON file persistence for the in-memory directory.

use std::path::{Path, PathBuf};

use crate::error::StorageResult;
use crate::memory::{DirectoryState, InMemoryDirectory};

/// A directory stored as a pretty-printed JSON document.
///
/// The file holds a [`DirectoryState`]. A missing file loads as an empty
/// directory.
#[derive(Debug, Clone)]
pub struct JsonDirectoryFile {
    path: PathBuf,
}

impl JsonDirectoryFile {
    /// Creates a handle for the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the directory from disk.
    pub fn load(&self) -> StorageResult<InMemoryDirectory> {
        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "Directory file not found, starting empty");
            return Ok(InMemoryDirectory::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        let state: DirectoryState = serde_json::from_str(&content)?;
        tracing::debug!(
            path = %self.path.display(),
            identities = state.identities.len(),
            sessions = state.sessions.len(),
            "Directory file loaded"
        );
        Ok(InMemoryDirectory::from_state(state))
    }

    /// Writes the directory back to disk.
    ///
    /// The document is written to a sibling temporary file first and then
    /// renamed over the original.
    pub fn save(&self, directory: &InMemoryDirectory) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(&directory.state())?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
