use core_library::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Device storage error for {remote_path}: {message}")]
    Device {
        remote_path: String,
        message: String,
    },

    #[error("Invalid song path: {0}")]
    InvalidPath(String),

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    #[error("Sync coordinator is no longer running")]
    CoordinatorStopped,
}

pub type Result<T> = std::result::Result<T, SyncError>;
