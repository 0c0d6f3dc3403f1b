use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upload ceiling enforced client-side, before any network call.
pub const MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;

/// Metadata for a file stored alongside an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Uuid,
    pub file_name: String,
    /// Reference into the backend's object storage.
    pub storage_path: String,
    pub file_type: String,
    pub size: u64,
    pub created_at: NaiveDateTime,
}

/// A pending upload: raw bytes plus the metadata the row needs.
#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    pub file_name: String,
    pub file_type: String,
    pub data: Vec<u8>,
}

impl AttachmentUpload {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn oversized(&self) -> bool {
        self.size() > MAX_ATTACHMENT_BYTES
    }
}
