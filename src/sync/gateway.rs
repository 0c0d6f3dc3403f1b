use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::core::attachment::{Attachment, AttachmentUpload};
use crate::core::bucket::bucket_for_date;
use crate::core::item::{Item, Priority, ReminderStatus, Status, TaskStatus};
use crate::core::list::{List, DEFAULT_LIST_COLOR};
use crate::core::note::Note;
use crate::core::patch::{ItemPatch, ListPatch};
use crate::core::recurrence::Recurrence;
use crate::sync::realtime::ChangeEvent;

/// Client-visible failure of a gateway call. Authorization failures stay
/// distinct from generic ones so the store can word them differently.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(String),
    #[error("not signed in")]
    Unauthorized,
    #[error("access denied: {0}")]
    Forbidden(String),
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("server error {status}: {body}")]
    Server { status: u16, body: String },
    #[error("invalid response: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::Forbidden(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListDraft {
    pub name: String,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub is_default: bool,
}

impl ListDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: DEFAULT_LIST_COLOR.to_string(),
            icon: None,
            is_default: false,
        }
    }

    /// The list created on first load for a user with none.
    pub fn default_list() -> Self {
        Self {
            is_default: true,
            ..Self::new("Inbox")
        }
    }
}

/// Kind-specific half of a new item.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DraftKind {
    Task {
        #[serde(skip_serializing_if = "Option::is_none")]
        category: Option<String>,
    },
    Reminder {
        #[serde(skip_serializing_if = "Option::is_none")]
        reminder_date: Option<NaiveDateTime>,
        #[serde(skip_serializing_if = "Option::is_none")]
        recurrence: Option<Recurrence>,
    },
}

impl DraftKind {
    /// Status a freshly created item of this shape receives.
    pub fn initial_status(&self, today: NaiveDate) -> Status {
        match self {
            Self::Task { .. } => Status::Task(TaskStatus::Start),
            Self::Reminder { recurrence: Some(r), .. } => {
                Status::Reminder(ReminderStatus::from_frequency(r.frequency))
            }
            Self::Reminder { reminder_date, .. } => {
                Status::Reminder(ReminderStatus::from_bucket(bucket_for_date(*reminder_date, today)))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemDraft {
    pub title: String,
    pub priority: Priority,
    pub list_id: Uuid,
    #[serde(flatten)]
    pub kind: DraftKind,
}

impl ItemDraft {
    pub fn task(title: impl Into<String>, list_id: Uuid) -> Self {
        Self {
            title: title.into(),
            priority: Priority::Low,
            list_id,
            kind: DraftKind::Task { category: None },
        }
    }

    pub fn reminder(
        title: impl Into<String>,
        list_id: Uuid,
        reminder_date: Option<NaiveDateTime>,
    ) -> Self {
        Self {
            title: title.into(),
            priority: Priority::Low,
            list_id,
            kind: DraftKind::Reminder {
                reminder_date,
                recurrence: None,
            },
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        if let DraftKind::Reminder { recurrence: slot, .. } = &mut self.kind {
            *slot = Some(recurrence);
        }
        self
    }
}

/// Result of a collaborator existence check.
#[derive(Debug, Clone, Deserialize)]
pub struct UserCheck {
    pub email: String,
    pub exists: bool,
}

/// One page of the change feed plus the cursor for the next poll.
#[derive(Debug, Default)]
pub struct ChangeBatch {
    pub events: Vec<ChangeEvent>,
    pub cursor: Option<String>,
}

/// The hosted backend's client-visible contract, scoped server-side to the
/// authenticated user and the lists shared with them. Concurrent mutations
/// are safe; conflicting edits resolve last-write-wins per field patch.
#[allow(async_fn_in_trait)]
pub trait Gateway {
    async fn list_lists(&self) -> Result<Vec<List>, GatewayError>;
    async fn create_list(&self, draft: &ListDraft) -> Result<List, GatewayError>;
    async fn update_list(&self, id: Uuid, patch: &ListPatch) -> Result<List, GatewayError>;
    async fn delete_list(&self, id: Uuid) -> Result<(), GatewayError>;

    async fn list_items(&self) -> Result<Vec<Item>, GatewayError>;
    async fn create_item(&self, draft: &ItemDraft) -> Result<Item, GatewayError>;
    async fn update_item(&self, id: Uuid, patch: &ItemPatch) -> Result<Item, GatewayError>;
    /// Hard delete; soft deletes go through `update_item`.
    async fn delete_item(&self, id: Uuid) -> Result<(), GatewayError>;

    async fn add_note(&self, item_id: Uuid, content: &str) -> Result<Note, GatewayError>;
    async fn update_note(
        &self,
        item_id: Uuid,
        note_id: Uuid,
        content: &str,
    ) -> Result<Note, GatewayError>;
    async fn delete_note(&self, item_id: Uuid, note_id: Uuid) -> Result<(), GatewayError>;

    async fn add_attachment(
        &self,
        item_id: Uuid,
        upload: &AttachmentUpload,
    ) -> Result<Attachment, GatewayError>;
    async fn delete_attachment(&self, item_id: Uuid, attachment_id: Uuid)
        -> Result<(), GatewayError>;

    async fn check_users_exist(&self, emails: &[String]) -> Result<Vec<UserCheck>, GatewayError>;

    /// The realtime subscription primitive: insert/update/delete events for
    /// items, lists and notes belonging to `lists`, each carrying the full
    /// row image, paged by an opaque cursor.
    async fn changes(
        &self,
        cursor: Option<&str>,
        lists: &[Uuid],
    ) -> Result<ChangeBatch, GatewayError>;
}
