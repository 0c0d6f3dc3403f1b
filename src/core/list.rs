use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_LIST_COLOR: &str = "#4a90d9";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct List {
    pub id: Uuid,
    pub name: String,
    /// Display only; never interpreted.
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// UI-enforced edit lock; the store does not gate on it.
    #[serde(default)]
    pub is_locked: bool,
    /// Exactly one list per user carries this.
    #[serde(default)]
    pub is_default: bool,
    /// Collaborator identities (emails) with access to this list.
    #[serde(default)]
    pub shared_with: Vec<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl List {
    pub fn new(name: impl Into<String>, now: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            color: DEFAULT_LIST_COLOR.to_string(),
            icon: None,
            is_locked: false,
            is_default: false,
            shared_with: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_shared(&self) -> bool {
        !self.shared_with.is_empty()
    }
}
