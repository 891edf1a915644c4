//! # Host Bridge Traits
//!
//! Platform abstraction traits that each host must implement for the player core.
//!
//! ## Overview
//!
//! This crate defines the contract between the sync core and platform-specific
//! code. Each trait is a capability the core needs but that differs per platform
//! (desktop, iOS, Android).
//!
//! ## Traits
//!
//! ### Cloud & Device Storage
//! - [`StorageProvider`](storage::StorageProvider) - Cloud listing and file download (Dropbox-style, path keyed)
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Device-local file I/O for downloaded songs
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to the host logger
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with a descriptive error when a required capability is
//! missing (see `core_runtime::config`):
//!
//! ```ignore
//! let provider = builder.storage_provider
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "StorageProvider".to_string(),
//!         message: "Inject the cloud provider adapter for this platform.".to_string(),
//!     })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it and keep the message actionable
//! (include the path or remote identifier involved).
//!
//! ## Thread Safety
//!
//! Every trait requires `Send + Sync` so adapters can be shared across tokio tasks
//! behind an `Arc`.

pub mod error;
pub mod logging;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use logging::{LogEntry, LogLevel, LoggerSink};
pub use storage::{FileSystemAccess, RemoteFile, StorageProvider};
