//! # Repository Pattern Implementation
//!
//! Repository traits and their SQLite implementations.
//!
//! ## Architecture
//!
//! - Traits define the interface the sync core depends on
//! - SQLite implementations use sqlx for async database access
//! - All operations return `Result<T>` for error handling
//!
//! ## Available Repositories
//!
//! - `SongRepository` - persisted songs and their pending sync actions

pub mod song;

pub use song::{SongRepository, SqliteSongRepository};
