//! Workspace placeholder crate.
//!
//! This crate exposes the workspace feature flags so a host application can
//! depend on `cloud-player-workspace` and pick the bridge set it needs
//! (currently `desktop-shims`) without wiring each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service as service;
