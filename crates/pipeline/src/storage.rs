//! Geometry file storage.
//!
//! Locations handed back by [`FileStorage::write_new`] are opaque strings that
//! get stored on the CAD file record and passed to the engine as-is.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Write `bytes` to a new file at `relative`. Never overwrites: an
    /// existing file fails with [`io::ErrorKind::AlreadyExists`].
    async fn write_new(&self, relative: &Path, bytes: &[u8]) -> io::Result<String>;

    /// Read a stored file from offset zero.
    async fn read(&self, location: &str) -> io::Result<Vec<u8>>;

    /// Remove a stored file. Removing a missing file is not an error.
    async fn remove(&self, location: &str) -> io::Result<()>;

    /// Remove the directory at `relative` with everything in it. Removing a
    /// missing directory is not an error.
    async fn remove_dir(&self, relative: &Path) -> io::Result<()>;
}

/// Files on the local filesystem below a root directory.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn write_new(&self, relative: &Path, bytes: &[u8]) -> io::Result<String> {
        let dest = self.root.join(relative);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&dest)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await?;

        Ok(dest.to_string_lossy().into_owned())
    }

    async fn read(&self, location: &str) -> io::Result<Vec<u8>> {
        tokio::fs::read(location).await
    }

    async fn remove(&self, location: &str) -> io::Result<()> {
        match tokio::fs::remove_file(location).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    async fn remove_dir(&self, relative: &Path) -> io::Result<()> {
        match tokio::fs::remove_dir_all(self.root.join(relative)).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
