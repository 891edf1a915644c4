//! # Sync Coordinator
//!
//! Owns the merged song inventory and drives sync runs between the cloud and
//! the device.
//!
//! ## Overview
//!
//! The coordinator is a single tokio task. Hosts talk to it through a
//! cloneable [`SyncHandle`]; commands arrive over an `mpsc` channel and the
//! results of background work (inventory loads, downloads, removals) come
//! back over an internal channel. Every persistence write happens on the
//! coordinator task, so a song's action state has a single writer.
//!
//! Outbound, the coordinator publishes:
//! - the merged inventory on a `watch` channel ([`SyncHandle::songs`])
//! - sync progress on a `broadcast` channel ([`SyncHandle::progress`])
//! - lifecycle events on the [`EventBus`]
//!
//! ## Workflow
//!
//! ### Refresh
//! 1. Load persisted songs (the device inventory) from the repository
//! 2. List songs on the cloud provider
//! 3. Each completion feeds the combine-latest merge; once both inventories
//!    are known the merged list is republished on every change
//!
//! ### Touch
//! The song's current state and its presence on the device are classified
//! with [`ActionState::classify`], the result is persisted and the inventory
//! entry is republished.
//!
//! ### Sync Run
//! 1. Query pending songs and publish their count
//! 2. Dispatch a download or removal per pending song
//! 3. On success reset the song to `NoAction` and publish the re-queried
//!    pending count
//! 4. On failure publish [`SyncProgress::Failed`]; the song stays pending
//!
//! Every progress publication also sweeps persisted `NoAction` songs that
//! are no longer on the device.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{SyncConfig, SyncCoordinator};
//!
//! let (handle, task) = SyncCoordinator::spawn(
//!     SyncConfig::default(),
//!     repository,
//!     cloud,
//!     device,
//!     event_bus,
//! );
//!
//! handle.refresh().await?;
//! let mut progress = handle.progress();
//! let run_id = handle.request_sync().await?;
//! while let Ok(update) = progress.recv().await {
//!     if update.is_complete() {
//!         break;
//!     }
//! }
//! ```

use crate::{
    cloud::{CloudLibrary, DEFAULT_AUDIO_EXTENSIONS},
    device::DeviceLibrary,
    inventory::Inventory,
    progress::{SyncProgress, SyncRunId},
    Result, SyncError,
};
use core_library::{ActionState, Song, SongRepository, WriteKind};
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent, SyncEvent};
use core_runtime::logging::strip_path;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Sync coordinator configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum downloads/removals running at once. `None` runs every
    /// pending operation concurrently.
    pub max_concurrent_operations: Option<usize>,

    /// Audio file extensions listed from the cloud
    pub audio_extensions: Vec<String>,

    /// Capacity of the command channel between handles and the coordinator
    pub command_buffer: usize,

    /// Capacity of the progress broadcast channel
    pub progress_buffer: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrent_operations: None,
            audio_extensions: DEFAULT_AUDIO_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            command_buffer: 32,
            progress_buffer: 64,
        }
    }
}

// =============================================================================
// Messages
// =============================================================================

enum Command {
    Refresh,
    DeviceSongs(Vec<Song>),
    CloudSongs(Vec<Song>),
    Snapshot {
        reply: oneshot::Sender<Option<Vec<Song>>>,
    },
    Toggle {
        song: Song,
        reply: oneshot::Sender<Result<Song>>,
    },
    Sync {
        reply: oneshot::Sender<Result<SyncRunId>>,
    },
}

enum Internal {
    DeviceLoaded(Result<Vec<Song>>),
    CloudLoaded(Result<Vec<Song>>),
    OperationFinished {
        run_id: SyncRunId,
        song: Song,
        operation: Operation,
        result: Result<()>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Download,
    Remove,
}

impl Operation {
    fn for_state(state: ActionState) -> Option<Self> {
        match state {
            ActionState::PendingToDownload => Some(Operation::Download),
            ActionState::PendingToRemoval => Some(Operation::Remove),
            ActionState::NoAction => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Operation::Download => "download",
            Operation::Remove => "remove",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outstanding operations of one run
#[derive(Debug, Default)]
struct RunTally {
    outstanding: usize,
    succeeded: u64,
    failed: u64,
}

// =============================================================================
// Handle
// =============================================================================

/// Cloneable entry point to a running [`SyncCoordinator`].
///
/// The coordinator stops once every handle is dropped and its in-flight
/// operations have reported back. Calls made after that return
/// [`SyncError::CoordinatorStopped`].
#[derive(Clone)]
pub struct SyncHandle {
    commands: mpsc::Sender<Command>,
    songs: watch::Receiver<Vec<Song>>,
    progress: broadcast::Sender<SyncProgress>,
    event_bus: EventBus,
}

impl SyncHandle {
    /// Merged inventory stream.
    ///
    /// Holds an empty list until both the device and the cloud inventory
    /// have been seen; `changed()` fires on the first merge.
    pub fn songs(&self) -> watch::Receiver<Vec<Song>> {
        self.songs.clone()
    }

    /// Progress stream of every sync run. Subscribe before requesting a sync
    /// to see its initial count.
    pub fn progress(&self) -> broadcast::Receiver<SyncProgress> {
        self.progress.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<CoreEvent> {
        self.event_bus.subscribe()
    }

    /// Reload the device inventory and the cloud listing.
    pub async fn refresh(&self) -> Result<()> {
        self.send(Command::Refresh).await
    }

    /// Replace the device inventory with songs supplied by the host.
    pub async fn set_device_songs(&self, songs: Vec<Song>) -> Result<()> {
        self.send(Command::DeviceSongs(songs)).await
    }

    /// Replace the cloud inventory with songs supplied by the host.
    pub async fn set_cloud_songs(&self, songs: Vec<Song>) -> Result<()> {
        self.send(Command::CloudSongs(songs)).await
    }

    /// Latest merged inventory, or `None` until both inventories are known.
    pub async fn current_songs(&self) -> Result<Option<Vec<Song>>> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        response.await.map_err(|_| SyncError::CoordinatorStopped)
    }

    /// Touch a song: mark it for download or removal, or cancel its pending
    /// action. Returns the song in its new state.
    pub async fn toggle(&self, song: Song) -> Result<Song> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Toggle { song, reply }).await?;
        response.await.map_err(|_| SyncError::CoordinatorStopped)?
    }

    /// Start a sync run over every pending song.
    ///
    /// Returns once the initial pending count has been published.
    pub async fn request_sync(&self) -> Result<SyncRunId> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Sync { reply }).await?;
        response.await.map_err(|_| SyncError::CoordinatorStopped)?
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SyncError::CoordinatorStopped)
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// Single-writer task owning the song inventory and the sync runs.
pub struct SyncCoordinator {
    repository: Arc<dyn SongRepository>,
    cloud: Arc<CloudLibrary>,
    device: Arc<dyn DeviceLibrary>,
    event_bus: EventBus,
    limiter: Option<Arc<Semaphore>>,

    commands: mpsc::Receiver<Command>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
    songs: watch::Sender<Vec<Song>>,
    progress: broadcast::Sender<SyncProgress>,

    inventory: Inventory,
    runs: HashMap<SyncRunId, RunTally>,
    /// Songs with a download or removal in flight
    dispatched: HashSet<String>,
    in_flight: usize,
}

impl SyncCoordinator {
    /// Create a coordinator and the handle that drives it.
    ///
    /// Nothing happens until [`SyncCoordinator::run`] is awaited or spawned.
    pub fn new(
        config: SyncConfig,
        repository: Arc<dyn SongRepository>,
        cloud: Arc<CloudLibrary>,
        device: Arc<dyn DeviceLibrary>,
        event_bus: EventBus,
    ) -> (Self, SyncHandle) {
        let (command_tx, commands) = mpsc::channel(config.command_buffer.max(1));
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (songs, songs_rx) = watch::channel(Vec::new());
        let (progress, _) = broadcast::channel(config.progress_buffer.max(1));

        let handle = SyncHandle {
            commands: command_tx,
            songs: songs_rx,
            progress: progress.clone(),
            event_bus: event_bus.clone(),
        };

        let coordinator = Self {
            repository,
            cloud,
            device,
            event_bus,
            limiter: config
                .max_concurrent_operations
                .map(|permits| Arc::new(Semaphore::new(permits.max(1)))),
            commands,
            internal_tx,
            internal_rx,
            songs,
            progress,
            inventory: Inventory::new(),
            runs: HashMap::new(),
            dispatched: HashSet::new(),
            in_flight: 0,
        };

        (coordinator, handle)
    }

    /// Create a coordinator and run it on the current tokio runtime.
    pub fn spawn(
        config: SyncConfig,
        repository: Arc<dyn SongRepository>,
        cloud: Arc<CloudLibrary>,
        device: Arc<dyn DeviceLibrary>,
        event_bus: EventBus,
    ) -> (SyncHandle, JoinHandle<()>) {
        let (coordinator, handle) = Self::new(config, repository, cloud, device, event_bus);
        (handle, tokio::spawn(coordinator.run()))
    }

    /// Process commands until every handle is dropped and all background
    /// work has reported back.
    pub async fn run(mut self) {
        debug!("Sync coordinator started");
        let mut commands_open = true;

        loop {
            if !commands_open && self.in_flight == 0 {
                break;
            }

            tokio::select! {
                command = self.commands.recv(), if commands_open => match command {
                    Some(command) => self.handle_command(command).await,
                    None => commands_open = false,
                },
                Some(internal) = self.internal_rx.recv() => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    self.handle_internal(internal).await;
                }
                else => break,
            }
        }

        debug!("Sync coordinator stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Refresh => {
                self.load_device();
                self.load_cloud();
            }
            Command::DeviceSongs(songs) => self.apply_device(songs),
            Command::CloudSongs(songs) => self.apply_cloud(songs),
            Command::Snapshot { reply } => {
                let _ = reply.send(self.inventory.merged().map(<[Song]>::to_vec));
            }
            Command::Toggle { song, reply } => {
                let result = self.toggle(song).await;
                let _ = reply.send(result);
            }
            Command::Sync { reply } => {
                let result = self.start_sync().await;
                let _ = reply.send(result);
            }
        }
    }

    async fn handle_internal(&mut self, internal: Internal) {
        match internal {
            Internal::DeviceLoaded(Ok(songs)) => self.apply_device(songs),
            Internal::DeviceLoaded(Err(e)) => {
                error!(error = %e, "Failed to load device songs");
            }
            Internal::CloudLoaded(Ok(songs)) => self.apply_cloud(songs),
            Internal::CloudLoaded(Err(e)) => {
                error!(error = %e, "Failed to load cloud songs");
            }
            Internal::OperationFinished {
                run_id,
                song,
                operation,
                result,
            } => self.finish_operation(run_id, song, operation, result).await,
        }
    }

    // -------------------------------------------------------------------------
    // Inventory
    // -------------------------------------------------------------------------

    fn load_device(&mut self) {
        let repository = self.repository.clone();
        self.spawn_internal(
            async move {
                Internal::DeviceLoaded(repository.get_songs().await.map_err(SyncError::from))
            },
            |e| Internal::DeviceLoaded(Err(e)),
        );
    }

    fn load_cloud(&mut self) {
        let cloud = self.cloud.clone();
        self.spawn_internal(
            async move { Internal::CloudLoaded(cloud.get_songs().await) },
            |e| Internal::CloudLoaded(Err(e)),
        );
    }

    fn apply_device(&mut self, songs: Vec<Song>) {
        debug!(count = songs.len(), "Device inventory updated");
        let merged = self.inventory.set_device(songs).map(<[Song]>::to_vec);
        if let Some(merged) = merged {
            self.publish_merged(merged);
        }
    }

    fn apply_cloud(&mut self, songs: Vec<Song>) {
        debug!(count = songs.len(), "Cloud inventory updated");
        let merged = self.inventory.set_cloud(songs).map(<[Song]>::to_vec);
        if let Some(merged) = merged {
            self.publish_merged(merged);
        }
    }

    fn publish_merged(&self, merged: Vec<Song>) {
        self.emit(CoreEvent::Library(LibraryEvent::InventoryMerged {
            song_count: merged.len(),
            device_count: self.inventory.device_len(),
            cloud_count: self.inventory.cloud_len(),
        }));
        self.songs.send_replace(merged);
    }

    fn mark(&mut self, remote_path: &str, state: ActionState) {
        let merged = self.inventory.mark(remote_path, state).map(<[Song]>::to_vec);
        if let Some(merged) = merged {
            self.songs.send_replace(merged);
        }
    }

    // -------------------------------------------------------------------------
    // Touch
    // -------------------------------------------------------------------------

    #[instrument(skip_all, fields(file = %strip_path(&song.remote_path)))]
    async fn toggle(&mut self, song: Song) -> Result<Song> {
        let current = match self.inventory.find(&song.remote_path) {
            Some(known) => known.clone(),
            None => self
                .repository
                .find_by_remote_path(&song.remote_path)
                .await?
                .unwrap_or(song),
        };

        let on_device = self.device.is_on_device(&current).await?;
        let transition = current.state.classify(on_device);
        let updated = current.with_state(transition.next);

        let written = match transition.write {
            WriteKind::Insert => self.repository.add_song(&updated).await,
            WriteKind::Update => self.repository.update_song(&updated).await,
        }
        .map_err(|e| {
            error!(error = %e, "Failed to persist song state");
            SyncError::from(e)
        })?;

        if !written {
            warn!(state = %updated.state, "Song state was not persisted");
        }

        debug!(from = %current.state, to = %updated.state, on_device, "Song touched");
        self.mark(&updated.remote_path, updated.state);
        self.emit(CoreEvent::Library(LibraryEvent::SongMarked {
            remote_path: updated.remote_path.clone(),
            state: updated.state.to_string(),
        }));

        Ok(updated)
    }

    // -------------------------------------------------------------------------
    // Sync runs
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn start_sync(&mut self) -> Result<SyncRunId> {
        let run_id = SyncRunId::new();

        let pending = match self.repository.get_songs_pending().await {
            Ok(pending) => pending,
            Err(e) => {
                error!(error = %e, "Failed to query pending songs");
                self.publish(SyncProgress::Failed).await;
                return Err(e.into());
            }
        };

        let count = pending.len() as u64;
        info!(run_id = %run_id, pending = count, "Starting sync run");
        self.emit(CoreEvent::Sync(SyncEvent::Started {
            run_id: run_id.to_string(),
            pending: count,
        }));
        self.publish(SyncProgress::Remaining(count)).await;

        let mut tally = RunTally::default();
        for song in pending {
            let Some(operation) = Operation::for_state(song.state) else {
                continue;
            };
            if !self.dispatched.insert(song.remote_path.clone()) {
                debug!(file = %strip_path(&song.remote_path), "Operation already in flight");
                continue;
            }

            tally.outstanding += 1;
            self.dispatch(run_id, song, operation);
        }

        if tally.outstanding == 0 {
            self.complete_run(run_id, &tally);
        } else {
            self.runs.insert(run_id, tally);
        }

        Ok(run_id)
    }

    fn dispatch(&mut self, run_id: SyncRunId, song: Song, operation: Operation) {
        let device = self.device.clone();
        let limiter = self.limiter.clone();
        let crashed = song.clone();

        self.spawn_internal(
            async move {
                let result = match limiter {
                    Some(limiter) => match limiter.acquire_owned().await {
                        Ok(_permit) => Self::perform(device.as_ref(), &song, operation).await,
                        Err(_) => Err(SyncError::CoordinatorStopped),
                    },
                    None => Self::perform(device.as_ref(), &song, operation).await,
                };

                Internal::OperationFinished {
                    run_id,
                    song,
                    operation,
                    result,
                }
            },
            move |e| Internal::OperationFinished {
                run_id,
                song: crashed,
                operation,
                result: Err(e),
            },
        );
    }

    async fn perform(device: &dyn DeviceLibrary, song: &Song, operation: Operation) -> Result<()> {
        match operation {
            Operation::Download => device.download(song).await,
            Operation::Remove => device.remove(song).await,
        }
    }

    #[instrument(skip_all, fields(run_id = %run_id, file = %strip_path(&song.remote_path), operation = %operation))]
    async fn finish_operation(
        &mut self,
        run_id: SyncRunId,
        song: Song,
        operation: Operation,
        result: Result<()>,
    ) {
        self.dispatched.remove(&song.remote_path);

        let outcome = match result {
            Ok(()) => self.settle(&song).await,
            Err(e) => Err(e),
        };

        let succeeded = match outcome {
            Ok(remaining) => {
                debug!(remaining, "Operation finished");
                self.emit(CoreEvent::Sync(SyncEvent::Progress {
                    run_id: run_id.to_string(),
                    remaining,
                }));
                self.publish(SyncProgress::Remaining(remaining)).await;
                true
            }
            Err(e) => {
                warn!(error = %e, "Operation failed");
                self.emit(CoreEvent::Sync(SyncEvent::OperationFailed {
                    run_id: run_id.to_string(),
                    remote_path: song.remote_path.clone(),
                    action: operation.to_string(),
                    message: e.to_string(),
                }));
                self.publish(SyncProgress::Failed).await;
                false
            }
        };

        let finished = match self.runs.get_mut(&run_id) {
            Some(tally) => {
                if succeeded {
                    tally.succeeded += 1;
                } else {
                    tally.failed += 1;
                }
                tally.outstanding = tally.outstanding.saturating_sub(1);
                tally.outstanding == 0
            }
            None => false,
        };

        if finished {
            if let Some(tally) = self.runs.remove(&run_id) {
                self.complete_run(run_id, &tally);
            }
        }
    }

    /// Reset a finished song to `NoAction` and re-query the pending count.
    async fn settle(&mut self, song: &Song) -> Result<u64> {
        let done = song.with_state(ActionState::NoAction);
        if !self.repository.update_song(&done).await? {
            warn!(file = %strip_path(&song.remote_path), "Finished song has no record");
        }
        self.mark(&done.remote_path, ActionState::NoAction);

        let pending = self.repository.get_songs_pending().await?;
        Ok(pending.len() as u64)
    }

    fn complete_run(&self, run_id: SyncRunId, tally: &RunTally) {
        info!(
            run_id = %run_id,
            succeeded = tally.succeeded,
            failed = tally.failed,
            "Sync run completed"
        );
        self.emit(CoreEvent::Sync(SyncEvent::Completed {
            run_id: run_id.to_string(),
            succeeded: tally.succeeded,
            failed: tally.failed,
        }));
    }

    // -------------------------------------------------------------------------
    // Progress and cleanup
    // -------------------------------------------------------------------------

    async fn publish(&mut self, progress: SyncProgress) {
        if self.progress.send(progress).is_err() {
            debug!(?progress, "No progress subscribers");
        }
        self.cleanup().await;
    }

    /// Delete persisted `NoAction` songs that are no longer on the device.
    async fn cleanup(&mut self) {
        let songs = match self.repository.get_songs().await {
            Ok(songs) => songs,
            Err(e) => {
                warn!(error = %e, "Cleanup skipped, failed to load songs");
                return;
            }
        };

        let mut absent = Vec::new();
        // songs with an operation in flight are settled when it reports back
        let candidates = songs
            .into_iter()
            .filter(|song| !song.state.is_pending() && !self.dispatched.contains(&song.remote_path));

        for song in candidates {
            match self.device.is_on_device(&song).await {
                Ok(true) => {}
                Ok(false) => absent.push(song),
                Err(e) => {
                    warn!(file = %strip_path(&song.remote_path), error = %e, "Presence check failed");
                }
            }
        }

        if absent.is_empty() {
            return;
        }

        match self.repository.remove_songs(&absent).await {
            Ok(count) => {
                info!(count, "Removed songs no longer on device");
                self.emit(CoreEvent::Library(LibraryEvent::SongsRemoved {
                    count: count as usize,
                }));
                self.load_device();
            }
            Err(e) => warn!(error = %e, "Failed to remove absent songs"),
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Run background work and report its result to the coordinator.
    ///
    /// A panicking task is reported through `on_panic`, so every spawned task
    /// sends exactly one `Internal` message.
    fn spawn_internal<F, P>(&mut self, task: F, on_panic: P)
    where
        F: std::future::Future<Output = Internal> + Send + 'static,
        P: FnOnce(SyncError) -> Internal + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let internal = match tokio::spawn(task).await {
                Ok(internal) => internal,
                Err(e) => {
                    error!(error = %e, "Background task panicked");
                    on_panic(SyncError::TaskFailed(e.to_string()))
                }
            };
            let _ = tx.send(internal);
        });
    }

    fn emit(&self, event: CoreEvent) {
        self.event_bus.emit(event).ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_for_state() {
        assert_eq!(
            Operation::for_state(ActionState::PendingToDownload),
            Some(Operation::Download)
        );
        assert_eq!(
            Operation::for_state(ActionState::PendingToRemoval),
            Some(Operation::Remove)
        );
        assert_eq!(Operation::for_state(ActionState::NoAction), None);
    }

    #[test]
    fn test_default_config_is_unbounded() {
        let config = SyncConfig::default();
        assert!(config.max_concurrent_operations.is_none());
        assert!(config.audio_extensions.iter().any(|ext| ext == "mp3"));
        assert!(config.command_buffer > 0);
        assert!(config.progress_buffer > 0);
    }
}
