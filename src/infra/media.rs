//! Read-only access to post pictures stored on disk.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("invalid media path")]
    InvalidPath,
    #[error("media file not found")]
    NotFound,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Filesystem-backed media directory.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Read a stored file into memory.
    pub async fn read(&self, stored_path: &str) -> Result<Bytes, MediaError> {
        let absolute = self.resolve(stored_path)?;
        match fs::read(&absolute).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(MediaError::NotFound),
            // Directories surface as read errors on some platforms.
            Err(_) if absolute.is_dir() => Err(MediaError::NotFound),
            Err(err) => Err(MediaError::Io(err)),
        }
    }

    /// Resolve the absolute path of a stored file, refusing anything outside the root.
    pub fn resolve(&self, stored_path: &str) -> Result<PathBuf, MediaError> {
        let relative = Path::new(stored_path);
        if stored_path.is_empty()
            || relative.is_absolute()
            || relative.components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::Prefix(_) | Component::RootDir
                )
            })
        {
            return Err(MediaError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}
