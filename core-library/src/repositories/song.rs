//! Song repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{ActionState, Song};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

/// Persistence contract for songs and their pending sync actions.
///
/// The sync coordinator is the only writer; it routes every state change
/// through `add_song`/`update_song` and sweeps stale records with
/// `remove_songs`.
#[async_trait]
pub trait SongRepository: Send + Sync {
    /// All persisted songs in display order.
    async fn get_songs(&self) -> Result<Vec<Song>>;

    /// Songs whose state is `PendingToDownload` or `PendingToRemoval`.
    async fn get_songs_pending(&self) -> Result<Vec<Song>>;

    /// Look up a single song by its cloud path.
    async fn find_by_remote_path(&self, remote_path: &str) -> Result<Option<Song>>;

    /// Persist a song as a new record.
    ///
    /// A record with the same cloud path is overwritten.
    ///
    /// # Returns
    /// - `Ok(true)` if the record was written
    /// - `Ok(false)` if nothing was written
    async fn add_song(&self, song: &Song) -> Result<bool>;

    /// Update an existing record.
    ///
    /// # Returns
    /// - `Ok(true)` if the record was updated
    /// - `Ok(false)` if no record has this cloud path
    async fn update_song(&self, song: &Song) -> Result<bool>;

    /// Delete the given songs in one transaction.
    ///
    /// Returns the number of records deleted.
    async fn remove_songs(&self, songs: &[Song]) -> Result<u64>;
}

/// Row shape of the `songs` table
#[derive(Debug, FromRow)]
struct SongRow {
    remote_path: String,
    name: String,
    artist: Option<String>,
    album: Option<String>,
    album_art: Option<Vec<u8>>,
    action_state: String,
}

impl TryFrom<SongRow> for Song {
    type Error = LibraryError;

    fn try_from(row: SongRow) -> Result<Self> {
        Ok(Song {
            state: row.action_state.parse()?,
            remote_path: row.remote_path,
            name: row.name,
            artist: row.artist,
            album: row.album,
            album_art: row.album_art,
        })
    }
}

const SELECT_SONGS: &str =
    "SELECT remote_path, name, artist, album, album_art, action_state FROM songs";

/// SQLite implementation of SongRepository
pub struct SqliteSongRepository {
    pool: SqlitePool,
}

impl SqliteSongRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn validate(song: &Song) -> Result<()> {
        song.validate().map_err(|msg| LibraryError::InvalidInput {
            field: "song".to_string(),
            message: msg,
        })
    }

    fn into_songs(rows: Vec<SongRow>) -> Result<Vec<Song>> {
        rows.into_iter().map(Song::try_from).collect()
    }
}

#[async_trait]
impl SongRepository for SqliteSongRepository {
    async fn get_songs(&self) -> Result<Vec<Song>> {
        let rows = sqlx::query_as::<_, SongRow>(&format!(
            "{} ORDER BY name COLLATE NOCASE, remote_path",
            SELECT_SONGS
        ))
        .fetch_all(&self.pool)
        .await?;

        Self::into_songs(rows)
    }

    async fn get_songs_pending(&self) -> Result<Vec<Song>> {
        let rows = sqlx::query_as::<_, SongRow>(&format!(
            "{} WHERE action_state != ? ORDER BY name COLLATE NOCASE, remote_path",
            SELECT_SONGS
        ))
        .bind(ActionState::NoAction.as_str())
        .fetch_all(&self.pool)
        .await?;

        Self::into_songs(rows)
    }

    async fn find_by_remote_path(&self, remote_path: &str) -> Result<Option<Song>> {
        let row = sqlx::query_as::<_, SongRow>(&format!("{} WHERE remote_path = ?", SELECT_SONGS))
            .bind(remote_path)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Song::try_from).transpose()
    }

    async fn add_song(&self, song: &Song) -> Result<bool> {
        Self::validate(song)?;
        let now = Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO songs (
                remote_path, name, artist, album, album_art, action_state,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(remote_path) DO UPDATE SET
                name = excluded.name,
                artist = excluded.artist,
                album = excluded.album,
                album_art = excluded.album_art,
                action_state = excluded.action_state,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&song.remote_path)
        .bind(&song.name)
        .bind(&song.artist)
        .bind(&song.album)
        .bind(&song.album_art)
        .bind(song.state.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(remote_path = %song.remote_path, state = %song.state, "Song added");
        Ok(result.rows_affected() > 0)
    }

    async fn update_song(&self, song: &Song) -> Result<bool> {
        Self::validate(song)?;

        let result = sqlx::query(
            r#"
            UPDATE songs SET
                name = ?, artist = ?, album = ?, album_art = ?,
                action_state = ?, updated_at = ?
            WHERE remote_path = ?
            "#,
        )
        .bind(&song.name)
        .bind(&song.artist)
        .bind(&song.album)
        .bind(&song.album_art)
        .bind(song.state.as_str())
        .bind(Utc::now().timestamp())
        .bind(&song.remote_path)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_songs(&self, songs: &[Song]) -> Result<u64> {
        if songs.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut removed = 0;

        for song in songs {
            let result = sqlx::query("DELETE FROM songs WHERE remote_path = ?")
                .bind(&song.remote_path)
                .execute(&mut *tx)
                .await?;
            removed += result.rows_affected();
        }

        tx.commit().await?;

        debug!(removed, "Songs removed");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn repository() -> SqliteSongRepository {
        SqliteSongRepository::new(create_test_pool().await.unwrap())
    }

    fn song(path: &str, name: &str, state: ActionState) -> Song {
        Song::builder(path).name(name).state(state).build().unwrap()
    }

    #[tokio::test]
    async fn test_add_and_find_song() {
        let repo = repository().await;
        let mut added = song("/Music/so-what.mp3", "So What", ActionState::PendingToDownload);
        added.artist = Some("Miles Davis".to_string());
        added.album_art = Some(vec![1, 2, 3]);

        assert!(repo.add_song(&added).await.unwrap());

        let found = repo
            .find_by_remote_path("/Music/so-what.mp3")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, added);
    }

    #[tokio::test]
    async fn test_add_existing_song_overwrites() {
        let repo = repository().await;
        let original = song("/Music/a.mp3", "A", ActionState::NoAction);
        repo.add_song(&original).await.unwrap();

        let again = original.with_state(ActionState::PendingToDownload);
        assert!(repo.add_song(&again).await.unwrap());

        let songs = repo.get_songs().await.unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].state, ActionState::PendingToDownload);
    }

    #[tokio::test]
    async fn test_update_missing_song_returns_false() {
        let repo = repository().await;
        let missing = song("/Music/ghost.mp3", "Ghost", ActionState::PendingToRemoval);

        assert!(!repo.update_song(&missing).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_changes_state() {
        let repo = repository().await;
        let original = song("/Music/a.mp3", "A", ActionState::NoAction);
        repo.add_song(&original).await.unwrap();

        let updated = original.with_state(ActionState::PendingToRemoval);
        assert!(repo.update_song(&updated).await.unwrap());

        let found = repo.find_by_remote_path("/Music/a.mp3").await.unwrap();
        assert_eq!(found.unwrap().state, ActionState::PendingToRemoval);
    }

    #[tokio::test]
    async fn test_get_songs_pending_filters_no_action() {
        let repo = repository().await;
        repo.add_song(&song("/Music/a.mp3", "A", ActionState::NoAction))
            .await
            .unwrap();
        repo.add_song(&song("/Music/b.mp3", "B", ActionState::PendingToDownload))
            .await
            .unwrap();
        repo.add_song(&song("/Music/c.mp3", "c", ActionState::PendingToRemoval))
            .await
            .unwrap();

        let pending = repo.get_songs_pending().await.unwrap();
        let paths: Vec<_> = pending.iter().map(|s| s.remote_path.as_str()).collect();
        assert_eq!(paths, vec!["/Music/b.mp3", "/Music/c.mp3"]);
    }

    #[tokio::test]
    async fn test_get_songs_in_display_order() {
        let repo = repository().await;
        for (path, name) in [("/3.mp3", "charlie"), ("/1.mp3", "Bravo"), ("/2.mp3", "alpha")] {
            repo.add_song(&song(path, name, ActionState::NoAction))
                .await
                .unwrap();
        }

        let names: Vec<_> = repo
            .get_songs()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["alpha", "Bravo", "charlie"]);
    }

    #[tokio::test]
    async fn test_remove_songs_counts_deleted_rows() {
        let repo = repository().await;
        let a = song("/Music/a.mp3", "A", ActionState::NoAction);
        let b = song("/Music/b.mp3", "B", ActionState::NoAction);
        repo.add_song(&a).await.unwrap();
        repo.add_song(&b).await.unwrap();

        let never_stored = song("/Music/z.mp3", "Z", ActionState::NoAction);
        let removed = repo.remove_songs(&[a, never_stored]).await.unwrap();

        assert_eq!(removed, 1);
        assert_eq!(repo.get_songs().await.unwrap(), vec![b]);
        assert_eq!(repo.remove_songs(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_song_is_rejected() {
        let repo = repository().await;
        let mut invalid = song("/Music/a.mp3", "A", ActionState::NoAction);
        invalid.name = String::new();

        let err = repo.add_song(&invalid).await.unwrap_err();
        assert!(matches!(err, LibraryError::InvalidInput { .. }));
    }
}
