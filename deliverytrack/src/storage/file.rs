//! File-backed local store.
//!
//! Each key is a file `<directory>/<key>.json`. Writes go to a sibling temp
//! file first and are renamed into place, so a crash mid-write leaves either
//! the old value or the new one.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{LocalStore, StorageError};

/// Directory-backed local store.
#[derive(Debug, Clone)]
pub struct FileLocalStore {
    directory: PathBuf,
}

impl FileLocalStore {
    /// Open a store rooted at `directory`, creating it if needed.
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    /// Default state directory (~/.deliverytrack/state).
    pub fn default_directory() -> PathBuf {
        crate::config::config_directory().join("state")
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.directory.join(format!("{}.json", key)))
    }
}

impl LocalStore for FileLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.key_path(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.key_path(key)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.key_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
