//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `FileSystemAccess` using `tokio::fs`
//!
//! Mobile hosts inject their own sandboxed adapters instead.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::TokioFileSystem;
//! use std::sync::Arc;
//!
//! let fs = Arc::new(TokioFileSystem::new());
//! let music_dir = TokioFileSystem::default_music_directory();
//! ```

mod filesystem;

pub use filesystem::TokioFileSystem;
