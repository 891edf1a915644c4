//! Sync progress reporting

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of one sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncRunId(pub Uuid);

impl SyncRunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SyncRunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SyncRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One progress event of a sync run.
///
/// Hosts that expect a single integer use [`SyncProgress::as_count`]:
/// the remaining pending count, or `-1` when an operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "remaining", rename_all = "snake_case")]
pub enum SyncProgress {
    /// Songs still pending after the latest query
    Remaining(u64),
    /// A download or removal failed
    Failed,
}

impl SyncProgress {
    pub const FAILED_SENTINEL: i64 = -1;

    pub fn as_count(&self) -> i64 {
        match self {
            SyncProgress::Remaining(count) => i64::try_from(*count).unwrap_or(i64::MAX),
            SyncProgress::Failed => Self::FAILED_SENTINEL,
        }
    }

    /// `true` once nothing is left pending.
    pub fn is_complete(&self) -> bool {
        matches!(self, SyncProgress::Remaining(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_count() {
        assert_eq!(SyncProgress::Remaining(3).as_count(), 3);
        assert_eq!(SyncProgress::Remaining(0).as_count(), 0);
        assert_eq!(SyncProgress::Failed.as_count(), -1);
    }

    #[test]
    fn test_is_complete_only_for_zero_remaining() {
        assert!(SyncProgress::Remaining(0).is_complete());
        assert!(!SyncProgress::Remaining(1).is_complete());
        assert!(!SyncProgress::Failed.is_complete());
    }

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(SyncRunId::new(), SyncRunId::new());
    }

    #[test]
    fn test_progress_serialization() {
        let json = serde_json::to_string(&SyncProgress::Remaining(2)).unwrap();
        assert_eq!(json, r#"{"kind":"remaining","remaining":2}"#);

        let json = serde_json::to_string(&SyncProgress::Failed).unwrap();
        assert_eq!(json, r#"{"kind":"failed"}"#);
    }
}
