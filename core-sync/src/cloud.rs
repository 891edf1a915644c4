//! Cloud song listing over a `StorageProvider`

use crate::{Result, SyncError};
use bridge_traits::storage::{RemoteFile, StorageProvider};
use core_library::Song;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Extensions listed as songs when no explicit list is configured.
pub const DEFAULT_AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "m4a", "aac", "flac", "alac", "wav", "aiff", "aif", "ogg", "oga", "opus",
];

/// Lists the songs stored under a cloud folder.
pub struct CloudLibrary {
    provider: Arc<dyn StorageProvider>,
    root: String,
    audio_extensions: Vec<String>,
}

impl CloudLibrary {
    pub fn new(provider: Arc<dyn StorageProvider>, root: impl Into<String>) -> Self {
        Self {
            provider,
            root: root.into(),
            audio_extensions: DEFAULT_AUDIO_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }

    /// Replace the accepted extensions (compared case-insensitively).
    pub fn with_audio_extensions(mut self, extensions: Vec<String>) -> Self {
        self.audio_extensions = extensions
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Fetch every page of the listing and convert audio files to songs.
    ///
    /// Songs come back with `ActionState::NoAction`; their pending state
    /// lives in the device inventory.
    #[instrument(skip(self), fields(root = %self.root))]
    pub async fn get_songs(&self) -> Result<Vec<Song>> {
        let mut songs = Vec::new();
        let mut cursor = None;
        let mut page_count = 0;

        loop {
            page_count += 1;
            debug!(page = page_count, cursor = ?cursor, "Fetching listing page");

            let (files, next_cursor) = self
                .provider
                .list_files(&self.root, cursor)
                .await
                .map_err(|e| SyncError::Provider(format!("Failed to list songs: {}", e)))?;

            for file in files.iter().filter(|file| self.is_audio_file(file)) {
                match Song::from_remote_path(file.path.as_str()) {
                    Ok(song) => songs.push(song),
                    Err(e) => warn!(path = %file.path, error = %e, "Skipping cloud file"),
                }
            }

            cursor = next_cursor;
            if cursor.is_none() {
                break;
            }
        }

        info!(songs = songs.len(), pages = page_count, "Cloud listing complete");
        Ok(songs)
    }

    fn is_audio_file(&self, file: &RemoteFile) -> bool {
        if file.is_folder {
            return false;
        }

        file.extension()
            .is_some_and(|ext| self.audio_extensions.iter().any(|e| *e == ext))
    }
}
