//! # Sync Module
//!
//! Keeps songs in cloud storage and on the device in step.
//!
//! ## Overview
//!
//! This module manages:
//! - Merging the device inventory with the cloud listing
//! - Marking songs for download or removal
//! - Running downloads and removals and reporting progress
//! - Sweeping persisted songs that left the device
//!
//! ## Components
//!
//! - **Inventory** (`inventory`): De-duplicating combine-latest merge of the two song sources
//! - **Cloud Library** (`cloud`): Paginated song listing over a `StorageProvider`
//! - **Device Library** (`device`): Presence checks, downloads and removals in local storage
//! - **Progress** (`progress`): Sync run identifiers and progress values
//! - **Sync Coordinator** (`coordinator`): Single-writer task driving all of the above

pub mod cloud;
pub mod coordinator;
pub mod device;
pub mod error;
pub mod inventory;
pub mod progress;

pub use cloud::{CloudLibrary, DEFAULT_AUDIO_EXTENSIONS};
pub use coordinator::{SyncConfig, SyncCoordinator, SyncHandle};
pub use device::{DeviceLibrary, LocalDeviceLibrary};
pub use error::{Result, SyncError};
pub use inventory::{merge_inventories, Inventory};
pub use progress::{SyncProgress, SyncRunId};
