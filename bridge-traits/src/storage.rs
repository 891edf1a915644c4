//! Cloud and Device Storage Abstractions
//!
//! Provides platform-agnostic traits for listing and downloading files from a
//! cloud provider and for writing songs into device-local storage.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// A file or folder entry returned by a cloud provider listing.
///
/// Providers that address files by path (Dropbox) put the display path in
/// `path`; it is the stable key the core uses to identify a song.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Full provider path, e.g. `/Music/Artist - Song.mp3`
    pub path: String,
    /// File name (last path segment)
    pub name: String,
    /// Size in bytes, when the provider reports it
    pub size: Option<u64>,
    /// Last modification time (Unix seconds)
    pub modified_at: Option<i64>,
    /// Whether this entry is a folder
    pub is_folder: bool,
    /// Provider content hash, if any
    pub content_hash: Option<String>,
}

impl RemoteFile {
    /// Lowercased file extension without the dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }
}

/// Cloud storage provider trait
///
/// Abstracts the remote side of the sync: the listing of available songs and
/// the download of a single file. Transport (HTTP, OAuth) stays inside the
/// implementation.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::StorageProvider;
///
/// async fn first_page(provider: &dyn StorageProvider) -> Result<()> {
///     let (files, next) = provider.list_files("/Music", None).await?;
///     println!("{} entries, more: {}", files.len(), next.is_some());
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// List one page of entries under `folder`.
    ///
    /// Returns the entries and a cursor for the next page, or `None` when the
    /// listing is exhausted.
    async fn list_files(
        &self,
        folder: &str,
        cursor: Option<String>,
    ) -> Result<(Vec<RemoteFile>, Option<String>)>;

    /// Download the full contents of the file at `path`.
    async fn download(&self, path: &str) -> Result<Bytes>;
}

/// File system access trait
///
/// Abstracts device-local file I/O:
/// - Desktop: direct filesystem access
/// - iOS/Android: the app's sandboxed documents directory
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Write data to a file, creating it if it doesn't exist
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Delete a file
    async fn delete_file(&self, path: &Path) -> Result<()>;
}
