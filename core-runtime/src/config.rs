//! # Core Configuration Module
//!
//! Configuration management for the cloud player core.
//!
//! ## Overview
//!
//! A builder constructs a `CoreConfig` holding every dependency and setting
//! the core needs. Validation is fail-fast: missing bridges are reported at
//! build time with an actionable message, never at first use.
//!
//! ## Required Dependencies
//!
//! - `StorageProvider` - cloud listing and downloads
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `FileSystemAccess` - device storage (desktop default: tokio fs)
//! - music directory (desktop default: the platform audio directory)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/path/to/songs.db")
//!     .music_dir("/path/to/music")
//!     .cloud_root("/Music")
//!     .storage_provider(Arc::new(MyDropboxProvider::new()))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{FileSystemAccess, StorageProvider};
use std::path::PathBuf;
use std::sync::Arc;

/// Core configuration for the cloud player.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Directory downloaded songs are written to
    pub music_dir: PathBuf,

    /// Cloud folder listed for songs (`""` is the provider root)
    pub cloud_root: String,

    /// Buffer size of the event bus and progress channels
    pub event_buffer_size: usize,

    /// Cap on concurrent downloads/removals. `None` is unbounded.
    pub max_concurrent_operations: Option<usize>,

    /// Cloud storage provider (required)
    pub storage_provider: Arc<dyn StorageProvider>,

    /// Device file system access
    pub file_system: Arc<dyn FileSystemAccess>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("music_dir", &self.music_dir)
            .field("cloud_root", &self.cloud_root)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("max_concurrent_operations", &self.max_concurrent_operations)
            .field("storage_provider", &"StorageProvider { ... }")
            .field("file_system", &"FileSystemAccess { ... }")
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// This checks:
    /// - Database path and music directory are not empty
    /// - Event buffer size is greater than zero
    /// - A configured concurrency cap is greater than zero
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if self.music_dir.as_os_str().is_empty() {
            return Err(Error::Config("Music directory cannot be empty".to_string()));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.max_concurrent_operations == Some(0) {
            return Err(Error::Config(
                "Concurrent operation limit must be greater than 0. \
                 Leave it unset for unbounded operations."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

fn storage_provider_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "StorageProvider".to_string(),
        message: "StorageProvider implementation is required for listing and downloading songs. \
                  Inject the host's cloud connector (e.g. a Dropbox client) with .storage_provider()."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    let fs: Arc<dyn FileSystemAccess> = Arc::new(bridge_desktop::TokioFileSystem::new());
    Ok(fs)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Err(Error::CapabilityMissing {
        capability: "FileSystemAccess".to_string(),
        message: "FileSystemAccess implementation is required for storing songs on the device. \
                  Desktop: enable the 'desktop-shims' feature to use the default TokioFileSystem. \
                  Mobile: inject the platform's sandboxed file access."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_music_dir() -> Result<PathBuf> {
    Ok(bridge_desktop::TokioFileSystem::default_music_directory())
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_music_dir() -> Result<PathBuf> {
    Err(Error::Config(
        "Music directory is required. Use .music_dir() to set it.".to_string(),
    ))
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    music_dir: Option<PathBuf>,
    cloud_root: Option<String>,
    event_buffer_size: Option<usize>,
    max_concurrent_operations: Option<usize>,
    storage_provider: Option<Arc<dyn StorageProvider>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
}

impl CoreConfigBuilder {
    /// Sets the database path.
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder().database_path("/path/to/songs.db");
    /// ```
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the directory downloaded songs are stored in.
    pub fn music_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.music_dir = Some(path.into());
        self
    }

    /// Sets the cloud folder listed for songs.
    ///
    /// Default: `""` (provider root)
    pub fn cloud_root(mut self, folder: impl Into<String>) -> Self {
        self.cloud_root = Some(folder.into());
        self
    }

    /// Default: 100
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Caps concurrent downloads/removals during a sync run.
    ///
    /// Default: unbounded
    pub fn max_concurrent_operations(mut self, limit: usize) -> Self {
        self.max_concurrent_operations = Some(limit);
        self
    }

    /// Sets the cloud storage provider (required).
    pub fn storage_provider(mut self, provider: Arc<dyn StorageProvider>) -> Self {
        self.storage_provider = Some(provider);
        self
    }

    /// Sets the file system access implementation.
    ///
    /// If not provided, the desktop default (tokio fs-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] when a required setting is missing or invalid
    /// - [`Error::CapabilityMissing`] when a required bridge was not injected
    ///   and no platform default exists
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let storage_provider = self
            .storage_provider
            .ok_or_else(storage_provider_missing_error)?;

        let music_dir = match self.music_dir {
            Some(dir) => dir,
            None => provide_default_music_dir()?,
        };

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system()?,
        };

        let config = CoreConfig {
            database_path,
            music_dir,
            cloud_root: self.cloud_root.unwrap_or_default(),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            max_concurrent_operations: self.max_concurrent_operations,
            storage_provider,
            file_system,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::RemoteFile;
    use bytes::Bytes;
    use std::path::Path;

    struct StubProvider;

    #[async_trait]
    impl StorageProvider for StubProvider {
        async fn list_files(
            &self,
            _folder: &str,
            _cursor: Option<String>,
        ) -> BridgeResult<(Vec<RemoteFile>, Option<String>)> {
            Ok((Vec::new(), None))
        }

        async fn download(&self, _path: &str) -> BridgeResult<Bytes> {
            Ok(Bytes::new())
        }
    }

    struct StubFileSystem;

    #[async_trait]
    impl FileSystemAccess for StubFileSystem {
        async fn exists(&self, _path: &Path) -> BridgeResult<bool> {
            Ok(false)
        }

        async fn create_dir_all(&self, _path: &Path) -> BridgeResult<()> {
            Ok(())
        }

        async fn write_file(&self, _path: &Path, _data: Bytes) -> BridgeResult<()> {
            Ok(())
        }

        async fn delete_file(&self, _path: &Path) -> BridgeResult<()> {
            Ok(())
        }
    }

    fn complete_builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .database_path("/db/songs.db")
            .music_dir("/music")
            .storage_provider(Arc::new(StubProvider))
            .file_system(Arc::new(StubFileSystem))
    }

    #[test]
    fn test_builder_with_all_required_fields() {
        let config = complete_builder().build().unwrap();

        assert_eq!(config.database_path, PathBuf::from("/db/songs.db"));
        assert_eq!(config.music_dir, PathBuf::from("/music"));
        assert_eq!(config.cloud_root, "");
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert_eq!(config.max_concurrent_operations, None);
    }

    #[test]
    fn test_builder_requires_database_path() {
        let result = CoreConfig::builder()
            .music_dir("/music")
            .storage_provider(Arc::new(StubProvider))
            .file_system(Arc::new(StubFileSystem))
            .build();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("Database path is required"));
    }

    #[test]
    fn test_builder_requires_storage_provider() {
        let result = CoreConfig::builder()
            .database_path("/db/songs.db")
            .music_dir("/music")
            .file_system(Arc::new(StubFileSystem))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, message }) => {
                assert_eq!(capability, "StorageProvider");
                assert!(message.contains(".storage_provider()"));
            }
            other => panic!("expected missing capability, got {:?}", other.map(|_| ())),
        }
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_file_system_without_desktop_shims() {
        let result = CoreConfig::builder()
            .database_path("/db/songs.db")
            .music_dir("/music")
            .storage_provider(Arc::new(StubProvider))
            .build();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("FileSystemAccess"));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_build_with_desktop_defaults() {
        let config = CoreConfig::builder()
            .database_path("/db/songs.db")
            .storage_provider(Arc::new(StubProvider))
            .build()
            .unwrap();

        assert!(config.music_dir.ends_with("cloud-player"));
    }

    #[test]
    fn test_validate_rejects_zero_event_buffer() {
        let result = complete_builder().event_buffer_size(0).build();
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("must be greater than 0"));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency_cap() {
        let result = complete_builder().max_concurrent_operations(0).build();
        assert!(matches!(result, Err(Error::Config(_))));

        let config = complete_builder().max_concurrent_operations(4).build().unwrap();
        assert_eq!(config.max_concurrent_operations, Some(4));
    }

    #[test]
    fn test_config_debug_hides_bridges() {
        let config = complete_builder().cloud_root("/Music").build().unwrap();
        let debug = format!("{:?}", config);

        assert!(debug.contains("cloud_root: \"/Music\""));
        assert!(debug.contains("StorageProvider { ... }"));
    }
}
