//! # Device Library
//!
//! Device-side capability of the sync: where a song lives locally, whether it
//! is present, and the download/removal operations a sync run dispatches.

use crate::{Result, SyncError};
use async_trait::async_trait;
use bridge_traits::storage::{FileSystemAccess, StorageProvider};
use core_library::Song;
use core_runtime::logging::strip_path;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

#[async_trait]
pub trait DeviceLibrary: Send + Sync {
    /// Whether the song's file is present in local storage.
    async fn is_on_device(&self, song: &Song) -> Result<bool>;

    /// Fetch the song from the cloud and store it locally.
    async fn download(&self, song: &Song) -> Result<()>;

    /// Delete the song's local file. Removing an absent file succeeds.
    async fn remove(&self, song: &Song) -> Result<()>;
}

/// Stores songs under a music directory, mirroring their cloud paths.
///
/// `/Music/Artist/song.mp3` is kept at `<music_dir>/Music/Artist/song.mp3`.
pub struct LocalDeviceLibrary {
    music_dir: PathBuf,
    provider: Arc<dyn StorageProvider>,
    file_system: Arc<dyn FileSystemAccess>,
}

impl LocalDeviceLibrary {
    pub fn new(
        music_dir: impl Into<PathBuf>,
        provider: Arc<dyn StorageProvider>,
        file_system: Arc<dyn FileSystemAccess>,
    ) -> Self {
        Self {
            music_dir: music_dir.into(),
            provider,
            file_system,
        }
    }

    pub fn music_dir(&self) -> &Path {
        &self.music_dir
    }

    /// Local path for a song.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidPath`] when the cloud path is empty or tries to
    /// leave the music directory.
    pub fn local_path(&self, song: &Song) -> Result<PathBuf> {
        let relative = Path::new(song.remote_path.trim_start_matches(['/', '\\']));
        let mut path = self.music_dir.clone();
        let mut segments = 0;

        for component in relative.components() {
            match component {
                Component::Normal(segment) => {
                    path.push(segment);
                    segments += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(SyncError::InvalidPath(song.remote_path.clone()));
                }
            }
        }

        if segments == 0 {
            return Err(SyncError::InvalidPath(song.remote_path.clone()));
        }

        Ok(path)
    }

    fn device_error(song: &Song, e: impl std::fmt::Display) -> SyncError {
        SyncError::Device {
            remote_path: song.remote_path.clone(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl DeviceLibrary for LocalDeviceLibrary {
    async fn is_on_device(&self, song: &Song) -> Result<bool> {
        let path = self.local_path(song)?;
        self.file_system
            .exists(&path)
            .await
            .map_err(|e| Self::device_error(song, e))
    }

    async fn download(&self, song: &Song) -> Result<()> {
        let path = self.local_path(song)?;

        let data = self
            .provider
            .download(&song.remote_path)
            .await
            .map_err(|e| SyncError::Provider(format!("Failed to download song: {}", e)))?;
        let size = data.len();

        self.file_system
            .write_file(&path, data)
            .await
            .map_err(|e| Self::device_error(song, e))?;

        info!(file = %strip_path(&song.remote_path), size, "Song downloaded");
        Ok(())
    }

    async fn remove(&self, song: &Song) -> Result<()> {
        let path = self.local_path(song)?;

        let exists = self
            .file_system
            .exists(&path)
            .await
            .map_err(|e| Self::device_error(song, e))?;
        if !exists {
            debug!(file = %strip_path(&song.remote_path), "Song already absent");
            return Ok(());
        }

        self.file_system
            .delete_file(&path)
            .await
            .map_err(|e| Self::device_error(song, e))?;

        info!(file = %strip_path(&song.remote_path), "Song removed from device");
        Ok(())
    }
}
