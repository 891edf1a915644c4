//! End-to-end tests for the core service façade
//!
//! A file-backed SQLite library, a mocked cloud provider and an in-memory
//! device file system are wired through `CoreService::start`.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::storage::{FileSystemAccess, RemoteFile, StorageProvider};
use bytes::Bytes;
use core_library::ActionState;
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, SyncEvent};
use core_service::{Artwork, CoreService, SongCell};
use mockall::mock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

mock! {
    Provider {}

    #[async_trait]
    impl StorageProvider for Provider {
        async fn list_files(
            &self,
            folder: &str,
            cursor: Option<String>,
        ) -> BridgeResult<(Vec<RemoteFile>, Option<String>)>;
        async fn download(&self, path: &str) -> BridgeResult<Bytes>;
    }
}

#[derive(Default)]
struct MemoryFileSystem {
    files: Mutex<HashMap<PathBuf, Bytes>>,
}

#[async_trait]
impl FileSystemAccess for MemoryFileSystem {
    async fn exists(&self, path: &Path) -> BridgeResult<bool> {
        Ok(self.files.lock().await.contains_key(path))
    }

    async fn create_dir_all(&self, _path: &Path) -> BridgeResult<()> {
        Ok(())
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> BridgeResult<()> {
        self.files.lock().await.insert(path.to_path_buf(), data);
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> BridgeResult<()> {
        self.files.lock().await.remove(path);
        Ok(())
    }
}

fn remote_file(path: &str) -> RemoteFile {
    RemoteFile {
        path: path.to_string(),
        name: path.rsplit('/').next().unwrap_or(path).to_string(),
        size: Some(2048),
        modified_at: None,
        is_folder: false,
        content_hash: None,
    }
}

fn provider() -> MockProvider {
    let mut provider = MockProvider::new();
    provider.expect_list_files().returning(|_, _| {
        Ok((
            vec![remote_file("/Music/b.mp3"), remote_file("/Music/a.mp3")],
            None,
        ))
    });
    provider
        .expect_download()
        .returning(|path| Ok(Bytes::from(format!("audio:{}", path))));
    provider
}

/// Fresh database file for one test.
fn database_path(test: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "cloud-player-{}-{}.db",
        test,
        std::process::id()
    ));
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
    path
}

async fn start(test: &str, fs: Arc<MemoryFileSystem>) -> CoreService {
    let config = CoreConfig::builder()
        .database_path(database_path(test))
        .music_dir("/device/music")
        .cloud_root("/Music")
        .storage_provider(Arc::new(provider()))
        .file_system(fs)
        .build()
        .unwrap();

    CoreService::start(config).await.unwrap()
}

#[tokio::test]
async fn test_start_publishes_merged_inventory() {
    let core = start("inventory", Arc::new(MemoryFileSystem::default())).await;
    let mut songs = core.songs();

    timeout(WAIT, songs.changed()).await.unwrap().unwrap();
    let cells: Vec<SongCell> = core_service::presenter::song_cells(&songs.borrow());

    let titles: Vec<_> = cells.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["a", "b"]);
    assert!(cells.iter().all(|c| c.artwork == Artwork::Placeholder));

    core.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_touch_and_sync_downloads_song() {
    let fs = Arc::new(MemoryFileSystem::default());
    let core = start("download", fs.clone()).await;
    let mut songs = core.songs();
    timeout(WAIT, songs.changed()).await.unwrap().unwrap();
    let first = songs.borrow_and_update()[0].clone();

    let touched = core.toggle(first).await.unwrap();
    assert_eq!(touched.state, ActionState::PendingToDownload);

    let mut completion = core.completion();
    let mut events = core.events();
    core.request_sync().await.unwrap();

    assert!(timeout(WAIT, completion.wait()).await.unwrap());

    let stored = fs
        .files
        .lock()
        .await
        .get(&PathBuf::from("/device/music/Music/a.mp3"))
        .cloned();
    assert_eq!(stored, Some(Bytes::from("audio:/Music/a.mp3")));

    let mut started = false;
    while let Some(Ok(event)) = events.try_recv() {
        if let CoreEvent::Sync(SyncEvent::Started { pending, .. }) = event {
            assert_eq!(pending, 1);
            started = true;
        }
    }
    assert!(started);

    core.shutdown().await.unwrap();
}
