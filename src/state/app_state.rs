//! Lifecycle state of the feed synchronizer.

/// Whether the recurring feed poll is scheduled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SyncState {
    /// No timer scheduled; manual refreshes still work
    #[default]
    Stopped,
    /// Recurring poll scheduled
    Running,
}
