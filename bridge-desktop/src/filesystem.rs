//! File System Access Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::FileSystemAccess,
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

const APP_DIR_NAME: &str = "cloud-player";

/// Tokio-based file system implementation
///
/// Songs are written as plain files; parent directories are created on demand
/// so nested cloud folders map one-to-one onto the device.
#[derive(Debug, Clone, Default)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    pub fn new() -> Self {
        Self
    }

    /// Default directory for downloaded songs.
    ///
    /// Uses the platform audio directory when known, otherwise the data
    /// directory, falling back to the system temp dir.
    pub fn default_music_directory() -> PathBuf {
        dirs::audio_dir()
            .or_else(dirs::data_dir)
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_DIR_NAME)
    }

    fn map_io_error(e: std::io::Error) -> BridgeError {
        BridgeError::Io(e)
    }
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn exists(&self, path: &Path) -> Result<bool> {
        fs::try_exists(path).await.map_err(Self::map_io_error)
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .await
            .map_err(Self::map_io_error)?;
        debug!(path = ?path, "Created directory");
        Ok(())
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent).await?;
        }

        fs::write(path, data.as_ref())
            .await
            .map_err(Self::map_io_error)?;
        debug!(path = ?path, size = data.len(), "Wrote file");
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, "Deleted file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn scratch_dir(name: &str) -> PathBuf {
        env::temp_dir().join(format!("bridge-desktop-{}-{}", name, std::process::id()))
    }

    #[test]
    fn test_default_music_directory_is_namespaced() {
        let dir = TokioFileSystem::default_music_directory();
        assert!(dir.ends_with(APP_DIR_NAME));
    }

    #[tokio::test]
    async fn test_write_creates_parents_and_delete_removes() {
        let fs = TokioFileSystem::new();
        let root = scratch_dir("write");
        let file = root.join("Artist").join("song.mp3");

        fs.write_file(&file, Bytes::from_static(b"ID3")).await.unwrap();
        assert!(fs.exists(&file).await.unwrap());

        fs.delete_file(&file).await.unwrap();
        assert!(!fs.exists(&file).await.unwrap());

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn test_delete_missing_file_is_error() {
        let fs = TokioFileSystem::new();
        let file = scratch_dir("missing").join("nope.mp3");

        let result = fs.delete_file(&file).await;
        assert!(matches!(result, Err(BridgeError::Io(_))));
    }
}
