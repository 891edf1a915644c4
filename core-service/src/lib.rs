//! Core service façade and bootstrap helpers.
//!
//! This crate wires a validated [`CoreConfig`] (cloud provider, device file
//! system, database location) into a running sync coordinator. Desktop apps
//! typically enable the `desktop-shims` feature so the config falls back to
//! the `bridge-desktop` file system; mobile hosts inject their own bridges.
//!
//! ```rust,ignore
//! use core_runtime::config::CoreConfig;
//! use core_service::CoreService;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/data/library.db")
//!     .music_dir("/data/music")
//!     .storage_provider(dropbox)
//!     .build()?;
//!
//! let core = CoreService::start(config).await?;
//! let mut songs = core.songs();
//! songs.changed().await?;
//! let cells = core_service::presenter::song_cells(&songs.borrow());
//! ```

pub mod error;
pub mod presenter;

pub use error::{CoreError, Result};
pub use presenter::{Artwork, SongCell};

use core_library::{create_pool, DatabaseConfig, Song, SqliteSongRepository};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use core_sync::{
    CloudLibrary, LocalDeviceLibrary, SyncConfig, SyncCoordinator, SyncHandle, SyncProgress,
    SyncRunId,
};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Primary façade exposed to host applications.
pub struct CoreService {
    handle: SyncHandle,
    task: JoinHandle<()>,
}

impl CoreService {
    /// Start the core with default sync settings derived from `config`.
    pub async fn start(config: CoreConfig) -> Result<Self> {
        let sync_config = SyncConfig {
            max_concurrent_operations: config.max_concurrent_operations,
            progress_buffer: config.event_buffer_size,
            ..SyncConfig::default()
        };
        Self::start_with(config, sync_config).await
    }

    /// Start the core with explicit sync settings.
    ///
    /// Opens the song database, prepares the music directory, spawns the sync
    /// coordinator and requests the first inventory refresh.
    pub async fn start_with(config: CoreConfig, sync_config: SyncConfig) -> Result<Self> {
        config.validate()?;

        let pool = create_pool(DatabaseConfig::new(&config.database_path)).await?;
        let repository = Arc::new(SqliteSongRepository::new(pool));

        config.file_system.create_dir_all(&config.music_dir).await?;

        let cloud = Arc::new(
            CloudLibrary::new(config.storage_provider.clone(), config.cloud_root.clone())
                .with_audio_extensions(sync_config.audio_extensions.clone()),
        );
        let device = Arc::new(LocalDeviceLibrary::new(
            config.music_dir.clone(),
            config.storage_provider.clone(),
            config.file_system.clone(),
        ));

        let (handle, task) = SyncCoordinator::spawn(
            sync_config,
            repository,
            cloud,
            device,
            EventBus::new(config.event_buffer_size),
        );
        handle.refresh().await?;

        info!(
            database = %config.database_path.display(),
            music_dir = %config.music_dir.display(),
            "Core service started"
        );
        Ok(Self { handle, task })
    }

    /// Merged song inventory stream.
    pub fn songs(&self) -> watch::Receiver<Vec<Song>> {
        self.handle.songs()
    }

    /// Sync progress stream: remaining pending songs, or the failure sentinel.
    pub fn progress(&self) -> broadcast::Receiver<SyncProgress> {
        self.handle.progress()
    }

    /// Stream of "sync complete" flags, one per progress event.
    pub fn completion(&self) -> SyncCompletion {
        SyncCompletion {
            progress: self.handle.progress(),
        }
    }

    pub fn events(&self) -> EventStream {
        EventStream::new(self.handle.events())
    }

    /// Start a sync run over every pending song.
    pub async fn request_sync(&self) -> Result<SyncRunId> {
        Ok(self.handle.request_sync().await?)
    }

    /// Reload the device inventory and the cloud listing.
    pub async fn refresh(&self) -> Result<()> {
        Ok(self.handle.refresh().await?)
    }

    /// Touch a song. See [`SyncHandle::toggle`].
    pub async fn toggle(&self, song: Song) -> Result<Song> {
        Ok(self.handle.toggle(song).await?)
    }

    /// Handle for hosts that drive the coordinator from several places.
    pub fn handle(&self) -> SyncHandle {
        self.handle.clone()
    }

    /// Stop the coordinator once in-flight operations have reported back.
    ///
    /// Handles obtained through [`CoreService::handle`] keep it running until
    /// they are dropped too.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.handle);
        self.task
            .await
            .map_err(|e| CoreError::InitializationFailed(format!("Coordinator task failed: {}", e)))?;
        debug!("Core service stopped");
        Ok(())
    }
}

/// Maps sync progress to completion flags: `true` once nothing is pending.
pub struct SyncCompletion {
    progress: broadcast::Receiver<SyncProgress>,
}

impl SyncCompletion {
    /// Next completion flag, or `None` once the coordinator has stopped.
    ///
    /// Progress events missed by a slow reader are skipped.
    pub async fn recv(&mut self) -> Option<bool> {
        loop {
            match self.progress.recv().await {
                Ok(progress) => return Some(progress.is_complete()),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Completion reader lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Wait until a progress event reports nothing pending.
    pub async fn wait(&mut self) -> bool {
        while let Some(complete) = self.recv().await {
            if complete {
                return true;
            }
        }
        false
    }
}
