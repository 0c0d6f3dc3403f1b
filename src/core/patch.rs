use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use super::item::{Item, ItemKind, Priority, ReminderStatus, Status, TaskStatus};
use super::list::List;
use super::recurrence::Recurrence;

/// Three-state patch value for an optional field, so "not provided" and
/// "explicitly set to null" never blur together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldPatch<T> {
    #[default]
    Unchanged,
    Set(T),
    Clear,
}

impl<T: Clone> FieldPatch<T> {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }

    pub fn apply(&self, target: &mut Option<T>) {
        match self {
            Self::Unchanged => {}
            Self::Set(value) => *target = Some(value.clone()),
            Self::Clear => *target = None,
        }
    }
}

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("patch does not match the item's type")]
    KindMismatch,
}

/// Task-only field changes.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub status: Option<TaskStatus>,
    pub category: FieldPatch<String>,
}

/// Reminder-only field changes (recurring reminders included).
#[derive(Debug, Clone, Default)]
pub struct ReminderPatch {
    pub status: Option<ReminderStatus>,
    pub reminder_date: FieldPatch<NaiveDateTime>,
    pub recurrence: FieldPatch<Recurrence>,
}

/// Kind-specific half of an item patch. Applying a `Task` patch to a
/// reminder (or vice versa) is an error, never a silent no-op.
#[derive(Debug, Clone)]
pub enum KindPatch {
    Task(TaskPatch),
    Reminder(ReminderPatch),
}

/// A field-level item mutation, last-write-wins at this granularity.
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub title: Option<String>,
    pub priority: Option<Priority>,
    pub list_id: Option<Uuid>,
    pub position: FieldPatch<i64>,
    pub deleted_at: FieldPatch<NaiveDateTime>,
    /// Metadata key edits; `Clear` removes the key.
    pub metadata: Vec<(String, FieldPatch<String>)>,
    pub kind: Option<KindPatch>,
}

impl ItemPatch {
    pub fn rename(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn set_priority(priority: Priority) -> Self {
        Self {
            priority: Some(priority),
            ..Self::default()
        }
    }

    pub fn move_to_list(list_id: Uuid) -> Self {
        Self {
            list_id: Some(list_id),
            ..Self::default()
        }
    }

    pub fn task_status(status: TaskStatus) -> Self {
        Self {
            kind: Some(KindPatch::Task(TaskPatch {
                status: Some(status),
                ..TaskPatch::default()
            })),
            ..Self::default()
        }
    }

    pub fn reminder_status(status: ReminderStatus) -> Self {
        Self {
            kind: Some(KindPatch::Reminder(ReminderPatch {
                status: Some(status),
                ..ReminderPatch::default()
            })),
            ..Self::default()
        }
    }

    pub fn status(status: Status) -> Self {
        match status {
            Status::Task(s) => Self::task_status(s),
            Status::Reminder(s) => Self::reminder_status(s),
        }
    }

    pub fn reminder_date(date: FieldPatch<NaiveDateTime>) -> Self {
        Self {
            kind: Some(KindPatch::Reminder(ReminderPatch {
                reminder_date: date,
                ..ReminderPatch::default()
            })),
            ..Self::default()
        }
    }

    /// Move a reminder into the `today` column: today implies immediacy, so
    /// the date is stamped along with the status.
    pub fn reminder_move_today(now: NaiveDateTime) -> Self {
        Self {
            kind: Some(KindPatch::Reminder(ReminderPatch {
                status: Some(ReminderStatus::Today),
                reminder_date: FieldPatch::Set(now),
                ..ReminderPatch::default()
            })),
            ..Self::default()
        }
    }

    pub fn soft_delete(at: NaiveDateTime) -> Self {
        Self {
            deleted_at: FieldPatch::Set(at),
            ..Self::default()
        }
    }

    /// Clear the deletion marker and reinstate a type-appropriate status.
    pub fn restore(status: Status) -> Self {
        let mut patch = Self::status(status);
        patch.deleted_at = FieldPatch::Clear;
        patch
    }

    pub fn metadata_set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            metadata: vec![(key.into(), FieldPatch::Set(value.into()))],
            ..Self::default()
        }
    }

    pub fn metadata_clear(key: impl Into<String>) -> Self {
        Self {
            metadata: vec![(key.into(), FieldPatch::Clear)],
            ..Self::default()
        }
    }

    /// True when the patch sets a reminder date but leaves the status alone;
    /// the store recomputes the date-derived bucket after such a write.
    pub fn sets_reminder_date_without_status(&self) -> bool {
        match &self.kind {
            Some(KindPatch::Reminder(p)) => {
                !p.reminder_date.is_unchanged() && p.status.is_none()
            }
            _ => false,
        }
    }

    /// Apply the patch to a local item, stamping `updated_at`.
    pub fn apply_to(&self, item: &mut Item, now: NaiveDateTime) -> Result<(), PatchError> {
        if let Some(kind) = &self.kind {
            match (kind, &mut item.kind) {
                (KindPatch::Task(patch), ItemKind::Task { status, category }) => {
                    if let Some(s) = patch.status {
                        *status = s;
                    }
                    patch.category.apply(category);
                }
                (
                    KindPatch::Reminder(patch),
                    ItemKind::Reminder { status, reminder_date, recurrence },
                ) => {
                    if let Some(s) = patch.status {
                        *status = s;
                    }
                    patch.reminder_date.apply(reminder_date);
                    patch.recurrence.apply(recurrence);
                }
                _ => return Err(PatchError::KindMismatch),
            }
        }
        if let Some(title) = &self.title {
            item.title = title.clone();
        }
        if let Some(priority) = self.priority {
            item.priority = priority;
        }
        if let Some(list_id) = self.list_id {
            item.list_id = list_id;
        }
        self.position.apply(&mut item.position);
        self.deleted_at.apply(&mut item.deleted_at);
        for (key, edit) in &self.metadata {
            match edit {
                FieldPatch::Unchanged => {}
                FieldPatch::Set(value) => {
                    item.metadata.insert(key.clone(), value.clone());
                }
                FieldPatch::Clear => {
                    item.metadata.remove(key);
                }
            }
        }
        item.updated_at = now;
        Ok(())
    }

    /// Wire body for the gateway: provided fields only, with explicit nulls
    /// for cleared ones.
    pub fn to_wire(&self) -> Value {
        let mut body = Map::new();
        if let Some(title) = &self.title {
            body.insert("title".into(), Value::String(title.clone()));
        }
        if let Some(priority) = self.priority {
            body.insert("priority".into(), Value::String(priority.as_str().into()));
        }
        if let Some(list_id) = self.list_id {
            body.insert("list_id".into(), Value::String(list_id.to_string()));
        }
        put_field(&mut body, "position", &self.position);
        put_field(&mut body, "deleted_at", &self.deleted_at);
        if !self.metadata.is_empty() {
            let mut meta = Map::new();
            for (key, edit) in &self.metadata {
                match edit {
                    FieldPatch::Unchanged => {}
                    FieldPatch::Set(value) => {
                        meta.insert(key.clone(), Value::String(value.clone()));
                    }
                    FieldPatch::Clear => {
                        meta.insert(key.clone(), Value::Null);
                    }
                }
            }
            body.insert("metadata".into(), Value::Object(meta));
        }
        match &self.kind {
            Some(KindPatch::Task(patch)) => {
                if let Some(status) = patch.status {
                    body.insert("status".into(), Value::String(status.as_str().into()));
                }
                put_field(&mut body, "category", &patch.category);
            }
            Some(KindPatch::Reminder(patch)) => {
                if let Some(status) = patch.status {
                    body.insert("status".into(), Value::String(status.as_str().into()));
                }
                put_field(&mut body, "reminder_date", &patch.reminder_date);
                put_field(&mut body, "recurrence", &patch.recurrence);
            }
            None => {}
        }
        Value::Object(body)
    }
}

fn put_field<T: serde::Serialize>(body: &mut Map<String, Value>, key: &str, field: &FieldPatch<T>) {
    match field {
        FieldPatch::Unchanged => {}
        FieldPatch::Set(value) => {
            body.insert(key.into(), serde_json::to_value(value).unwrap_or(Value::Null));
        }
        FieldPatch::Clear => {
            body.insert(key.into(), Value::Null);
        }
    }
}

/// Field-level list mutation.
#[derive(Debug, Clone, Default)]
pub struct ListPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: FieldPatch<String>,
    pub is_locked: Option<bool>,
    pub shared_with: Option<Vec<String>>,
}

impl ListPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn share_with(emails: Vec<String>) -> Self {
        Self {
            shared_with: Some(emails),
            ..Self::default()
        }
    }

    pub fn apply_to(&self, list: &mut List, now: NaiveDateTime) {
        if let Some(name) = &self.name {
            list.name = name.clone();
        }
        if let Some(color) = &self.color {
            list.color = color.clone();
        }
        self.icon.apply(&mut list.icon);
        if let Some(locked) = self.is_locked {
            list.is_locked = locked;
        }
        if let Some(shared) = &self.shared_with {
            list.shared_with = shared.clone();
        }
        list.updated_at = now;
    }

    pub fn to_wire(&self) -> Value {
        let mut body = Map::new();
        if let Some(name) = &self.name {
            body.insert("name".into(), Value::String(name.clone()));
        }
        if let Some(color) = &self.color {
            body.insert("color".into(), Value::String(color.clone()));
        }
        put_field(&mut body, "icon", &self.icon);
        if let Some(locked) = self.is_locked {
            body.insert("is_locked".into(), Value::Bool(locked));
        }
        if let Some(shared) = &self.shared_with {
            body.insert(
                "shared_with".into(),
                Value::Array(shared.iter().cloned().map(Value::String).collect()),
            );
        }
        Value::Object(body)
    }
}
