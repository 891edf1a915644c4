//! # Song Library Module
//!
//! Owns the persisted song set and the song domain model.
//!
//! ## Overview
//!
//! This module manages:
//! - The `Song` entity, its `ActionState` and the per-song state transitions
//! - SQLite connection pooling and schema migrations
//! - `SongRepository`, the persistence contract the sync coordinator writes
//!   through, with its SQLite implementation

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{LibraryError, Result};
pub use models::{ActionState, Song, SongBuilder, Transition, WriteKind};
pub use repositories::{SongRepository, SqliteSongRepository};
