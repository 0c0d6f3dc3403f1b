pub mod anthropic;
pub mod gateway;
pub mod http;
pub mod keyring;
pub mod realtime;

/// Current sync status displayed in the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    Idle,
    Syncing,
    Error(String),
    LastSynced(String), // formatted timestamp
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self::Idle
    }
}
