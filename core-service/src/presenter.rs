//! List-cell presentation of songs
//!
//! Maps a [`Song`] to the texts and artwork a song list row shows. Rendering
//! stays with the host UI.

use core_library::{ActionState, Song};
use serde::Serialize;

/// Artwork shown next to a song.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "bytes", rename_all = "snake_case")]
pub enum Artwork {
    /// Image bytes embedded in the song
    Embedded(Vec<u8>),
    /// The host's placeholder image
    Placeholder,
}

/// Display values for one song row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongCell {
    pub remote_path: String,
    pub title: String,
    /// Empty when the song has no artist tag
    pub artist: String,
    /// Empty when the song has no album tag
    pub album: String,
    pub artwork: Artwork,
    pub state: ActionState,
}

impl From<&Song> for SongCell {
    fn from(song: &Song) -> Self {
        let artwork = match &song.album_art {
            Some(bytes) if !bytes.is_empty() => Artwork::Embedded(bytes.clone()),
            _ => Artwork::Placeholder,
        };

        Self {
            remote_path: song.remote_path.clone(),
            title: song.name.clone(),
            artist: song.artist.clone().unwrap_or_default(),
            album: song.album.clone().unwrap_or_default(),
            artwork,
            state: song.state,
        }
    }
}

/// Cells for a whole list, in the given order.
pub fn song_cells(songs: &[Song]) -> Vec<SongCell> {
    songs.iter().map(SongCell::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_from_tagged_song() {
        let song = Song::builder("/Music/so-what.mp3")
            .name("So What")
            .artist("Miles Davis")
            .album("Kind of Blue")
            .album_art(vec![0x89, 0x50, 0x4e, 0x47])
            .state(ActionState::PendingToDownload)
            .build()
            .unwrap();

        let cell = SongCell::from(&song);

        assert_eq!(cell.title, "So What");
        assert_eq!(cell.artist, "Miles Davis");
        assert_eq!(cell.album, "Kind of Blue");
        assert_eq!(cell.artwork, Artwork::Embedded(vec![0x89, 0x50, 0x4e, 0x47]));
        assert_eq!(cell.state, ActionState::PendingToDownload);
    }

    #[test]
    fn test_cell_without_tags_uses_placeholder() {
        let song = Song::from_remote_path("/Music/untitled.mp3").unwrap();

        let cell = SongCell::from(&song);

        assert_eq!(cell.title, "untitled");
        assert!(cell.artist.is_empty());
        assert!(cell.album.is_empty());
        assert_eq!(cell.artwork, Artwork::Placeholder);
    }

    #[test]
    fn test_empty_artwork_is_placeholder() {
        let song = Song::builder("/Music/a.mp3")
            .name("A")
            .album_art(Vec::new())
            .build()
            .unwrap();

        assert_eq!(SongCell::from(&song).artwork, Artwork::Placeholder);
    }

    #[test]
    fn test_cell_serialization() {
        let song = Song::from_remote_path("/Music/a.mp3").unwrap();
        let json = serde_json::to_value(SongCell::from(&song)).unwrap();

        assert_eq!(json["title"], "a");
        assert_eq!(json["artwork"]["kind"], "placeholder");
        assert_eq!(json["state"], "no_action");
    }
}
