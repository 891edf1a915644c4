//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the cloud player core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! Every other core crate depends on this one for its logging conventions
//! and for publishing library and sync events to host observers.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
