//! Flat, name-addressed file storage.

use std::fs;
use std::path::{Path, PathBuf};

use fott_core::{FileBundle, FileType};

use crate::error::{RedactError, Result};

pub trait Storage: Send + Sync {
    /// Names of the files directly under this storage, sorted.
    fn list(&self) -> Result<Vec<String>>;

    fn read(&self, name: &str) -> Result<Vec<u8>>;

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()>;
}

/// A directory on the local file system. Subdirectories are not listed.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Opens `root`, creating it if needed.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let storage = Self::new(root);
        fs::create_dir_all(&storage.root)
            .map_err(|e| RedactError::storage(storage.root.display().to_string(), e))?;
        Ok(storage)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Storage for LocalStorage {
    fn list(&self) -> Result<Vec<String>> {
        let root = self.root.display().to_string();
        let entries = fs::read_dir(&self.root).map_err(|e| RedactError::storage(root.clone(), e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RedactError::storage(root.clone(), e))?;
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => log::warn!("[Storage] skipping non UTF-8 file name {:?}", name),
            }
        }
        names.sort();
        Ok(names)
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        fs::read(self.path(name)).map_err(|e| RedactError::storage(name, e))
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        fs::write(self.path(name), bytes).map_err(|e| RedactError::storage(name, e))
    }
}

/// Complete bundles of class `kind` found in `storage`.
pub fn list_bundles(storage: &dyn Storage, kind: FileType) -> Result<Vec<FileBundle>> {
    Ok(FileBundle::from_names(&storage.list()?, kind))
}
