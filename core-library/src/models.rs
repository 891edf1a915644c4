//! Domain models for the song library
//!
//! A `Song` is identified by its cloud path. Its `ActionState` records the
//! pending sync action, and transitions between states are computed here as
//! plain values so the sync coordinator stays the only writer.

use crate::error::{LibraryError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Action State
// =============================================================================

/// Pending sync action for a song. Exactly one holds at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionState {
    #[default]
    NoAction,
    PendingToDownload,
    PendingToRemoval,
}

impl ActionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionState::NoAction => "no_action",
            ActionState::PendingToDownload => "pending_to_download",
            ActionState::PendingToRemoval => "pending_to_removal",
        }
    }

    pub fn is_pending(&self) -> bool {
        !matches!(self, ActionState::NoAction)
    }

    /// Computes the next state when a user touches a song.
    ///
    /// | current            | on device | next                | write  |
    /// |--------------------|-----------|---------------------|--------|
    /// | `NoAction`         | no        | `PendingToDownload` | insert |
    /// | `NoAction`         | yes       | `PendingToRemoval`  | update |
    /// | pending (either)   | any       | `NoAction`          | update |
    pub fn classify(self, on_device: bool) -> Transition {
        match (self, on_device) {
            (ActionState::NoAction, false) => Transition {
                next: ActionState::PendingToDownload,
                write: WriteKind::Insert,
            },
            (ActionState::NoAction, true) => Transition {
                next: ActionState::PendingToRemoval,
                write: WriteKind::Update,
            },
            (ActionState::PendingToDownload | ActionState::PendingToRemoval, _) => Transition {
                next: ActionState::NoAction,
                write: WriteKind::Update,
            },
        }
    }
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionState {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "no_action" => Ok(ActionState::NoAction),
            "pending_to_download" => Ok(ActionState::PendingToDownload),
            "pending_to_removal" => Ok(ActionState::PendingToRemoval),
            other => Err(LibraryError::invalid(
                "action_state",
                format!("unknown action state '{}'", other),
            )),
        }
    }
}

/// How a transition must be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    /// New record (`SongRepository::add_song`)
    Insert,
    /// Existing record (`SongRepository::update_song`)
    Update,
}

/// Result of [`ActionState::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: ActionState,
    pub write: WriteKind,
}

// =============================================================================
// Song
// =============================================================================

/// A song known from the device store or the cloud listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    /// Path on the cloud provider. Unique identity across inventories.
    pub remote_path: String,
    /// Display name
    pub name: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Embedded artwork bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_art: Option<Vec<u8>>,
    pub state: ActionState,
}

impl Song {
    pub fn builder(remote_path: impl Into<String>) -> SongBuilder {
        SongBuilder::new(remote_path)
    }

    /// Builds a `NoAction` song for a cloud file that carries no tag metadata.
    ///
    /// The display name is the file name without its extension.
    pub fn from_remote_path(remote_path: impl Into<String>) -> Result<Self> {
        let remote_path = remote_path.into();
        let file_name = remote_path
            .rsplit('/')
            .next()
            .unwrap_or(remote_path.as_str());
        let name = match file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => file_name,
        }
        .to_string();

        SongBuilder::new(remote_path).name(name).build()
    }

    /// Natural list ordering: name (case-insensitive), then cloud path.
    pub fn display_order(&self, other: &Song) -> Ordering {
        self.name
            .to_lowercase()
            .cmp(&other.name.to_lowercase())
            .then_with(|| self.remote_path.cmp(&other.remote_path))
    }

    /// Returns a copy carrying `state`.
    pub fn with_state(&self, state: ActionState) -> Song {
        Song {
            state,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.remote_path.trim().is_empty() {
            return Err("Song remote path cannot be empty".to_string());
        }

        if self.name.trim().is_empty() {
            return Err("Song name cannot be empty".to_string());
        }

        Ok(())
    }
}

/// Builder for [`Song`] that enforces the required fields.
#[derive(Debug, Clone, Default)]
pub struct SongBuilder {
    remote_path: String,
    name: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    album_art: Option<Vec<u8>>,
    state: ActionState,
}

impl SongBuilder {
    pub fn new(remote_path: impl Into<String>) -> Self {
        Self {
            remote_path: remote_path.into(),
            ..Default::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn album_art(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.album_art = Some(bytes.into());
        self
    }

    pub fn state(mut self, state: ActionState) -> Self {
        self.state = state;
        self
    }

    /// # Errors
    ///
    /// Returns [`LibraryError::InvalidInput`] when the remote path or the
    /// name is missing or blank.
    pub fn build(self) -> Result<Song> {
        if self.remote_path.trim().is_empty() {
            return Err(LibraryError::invalid(
                "remote_path",
                "a song needs its cloud path",
            ));
        }

        let name = self
            .name
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| {
                LibraryError::invalid(
                    "name",
                    format!("song '{}' has no display name", self.remote_path),
                )
            })?;

        Ok(Song {
            remote_path: self.remote_path,
            name,
            artist: self.artist,
            album: self.album,
            album_art: self.album_art,
            state: self.state,
        })
    }
}
