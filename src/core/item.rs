use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::attachment::Attachment;
use super::bucket::{bucket_for_date, Bucket};
use super::note::Note;
use super::recurrence::{Frequency, Recurrence};

/// Metadata key for the on-hold flag driven by hold-directive notes.
pub const ON_HOLD_KEY: &str = "on_hold";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Now,
    High,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Now => "now",
            Self::High => "high",
            Self::Low => "low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "now" => Some(Self::Now),
            "high" => Some(Self::High),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "start")]
    Start,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "complete")]
    Complete,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::InProgress => "in-progress",
            Self::Complete => "complete",
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Status domain for reminders. Date buckets for plain reminders, frequency
/// names for recurring ones, `complete` for both. Everything except
/// `complete` is recomputed on read, never trusted from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Today,
    Within7,
    #[serde(rename = "7plus")]
    SevenPlus,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Complete,
}

impl ReminderStatus {
    pub fn from_bucket(bucket: Bucket) -> Self {
        match bucket {
            Bucket::Today => Self::Today,
            Bucket::Within7 => Self::Within7,
            Bucket::SevenPlus => Self::SevenPlus,
        }
    }

    pub fn from_frequency(frequency: Frequency) -> Self {
        match frequency {
            Frequency::Minutely => Self::Minutely,
            Frequency::Hourly => Self::Hourly,
            Frequency::Daily => Self::Daily,
            Frequency::Weekly => Self::Weekly,
            Frequency::Monthly => Self::Monthly,
            Frequency::Yearly => Self::Yearly,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Within7 => "within7",
            Self::SevenPlus => "7plus",
            Self::Minutely => "minutely",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Complete => "complete",
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Unified status, used by view columns and drag-and-drop move targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Task(TaskStatus),
    Reminder(ReminderStatus),
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task(s) => s.as_str(),
            Self::Reminder(s) => s.as_str(),
        }
    }

    pub fn is_complete(&self) -> bool {
        match self {
            Self::Task(s) => s.is_complete(),
            Self::Reminder(s) => s.is_complete(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ItemKind {
    Task {
        status: TaskStatus,
        /// Free-text category, task-only.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category: Option<String>,
    },
    Reminder {
        status: ReminderStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reminder_date: Option<NaiveDateTime>,
        /// Present for recurring reminders.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        recurrence: Option<Recurrence>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub title: String,
    pub priority: Priority,
    pub list_id: Uuid,
    #[serde(flatten)]
    pub kind: ItemKind,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Free-form flags; at least the on-hold flag lives here.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    /// Presence marks the item as soft-deleted ("trashed").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

impl Item {
    pub fn new_task(title: impl Into<String>, list_id: Uuid, now: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            priority: Priority::Low,
            list_id,
            kind: ItemKind::Task {
                status: TaskStatus::Start,
                category: None,
            },
            notes: Vec::new(),
            attachments: Vec::new(),
            metadata: BTreeMap::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            position: None,
        }
    }

    pub fn new_reminder(
        title: impl Into<String>,
        list_id: Uuid,
        reminder_date: Option<NaiveDateTime>,
        now: NaiveDateTime,
    ) -> Self {
        let status = ReminderStatus::from_bucket(bucket_for_date(reminder_date, now.date()));
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            priority: Priority::Low,
            list_id,
            kind: ItemKind::Reminder {
                status,
                reminder_date,
                recurrence: None,
            },
            notes: Vec::new(),
            attachments: Vec::new(),
            metadata: BTreeMap::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            position: None,
        }
    }

    pub fn is_task(&self) -> bool {
        matches!(self.kind, ItemKind::Task { .. })
    }

    pub fn is_reminder(&self) -> bool {
        matches!(self.kind, ItemKind::Reminder { .. })
    }

    /// A reminder with a recurrence is the effective third variant.
    pub fn is_recurring(&self) -> bool {
        matches!(self.kind, ItemKind::Reminder { recurrence: Some(_), .. })
    }

    pub fn reminder_date(&self) -> Option<NaiveDateTime> {
        match &self.kind {
            ItemKind::Reminder { reminder_date, .. } => *reminder_date,
            ItemKind::Task { .. } => None,
        }
    }

    pub fn recurrence(&self) -> Option<&Recurrence> {
        match &self.kind {
            ItemKind::Reminder { recurrence, .. } => recurrence.as_ref(),
            ItemKind::Task { .. } => None,
        }
    }

    pub fn category(&self) -> Option<&str> {
        match &self.kind {
            ItemKind::Task { category, .. } => category.as_deref(),
            ItemKind::Reminder { .. } => None,
        }
    }

    pub fn status(&self) -> Status {
        match &self.kind {
            ItemKind::Task { status, .. } => Status::Task(*status),
            ItemKind::Reminder { status, .. } => Status::Reminder(*status),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status().is_complete()
    }

    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Neither trashed nor complete. Deletion takes precedence for trash
    /// membership, completion for the complete view; an item is in exactly
    /// one of {active, trashed, completed}.
    pub fn is_active(&self) -> bool {
        !self.is_trashed() && !self.is_complete()
    }

    pub fn on_hold(&self) -> bool {
        self.metadata.get(ON_HOLD_KEY).is_some_and(|v| v == "true")
    }

    /// Effective status for display. `complete` is sticky; a recurring
    /// reminder shows its frequency; a plain reminder's bucket is recomputed
    /// from its date on every read.
    pub fn display_status(&self, today: NaiveDate) -> Status {
        match &self.kind {
            ItemKind::Task { status, .. } => Status::Task(*status),
            ItemKind::Reminder { status, .. } if status.is_complete() => {
                Status::Reminder(ReminderStatus::Complete)
            }
            ItemKind::Reminder { recurrence: Some(r), .. } => {
                Status::Reminder(ReminderStatus::from_frequency(r.frequency))
            }
            ItemKind::Reminder { reminder_date, .. } => {
                Status::Reminder(ReminderStatus::from_bucket(bucket_for_date(*reminder_date, today)))
            }
        }
    }

    /// Notes ordered for display, most recent first.
    pub fn sorted_notes(&self) -> Vec<&Note> {
        let mut notes: Vec<&Note> = self.notes.iter().collect();
        notes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        notes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn dated_reminder_status_recomputes_from_date() {
        let now = at(2026, 3, 10);
        let item = Item::new_reminder("dentist", Uuid::new_v4(), Some(at(2026, 3, 13)), now);
        assert_eq!(
            item.display_status(now.date()),
            Status::Reminder(ReminderStatus::Within7)
        );
        // Five days later the same date has become overdue.
        assert_eq!(
            item.display_status(NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()),
            Status::Reminder(ReminderStatus::Today)
        );
    }

    #[test]
    fn complete_is_sticky_over_the_date() {
        let now = at(2026, 3, 10);
        let mut item = Item::new_reminder("dentist", Uuid::new_v4(), Some(at(2026, 3, 1)), now);
        if let ItemKind::Reminder { status, .. } = &mut item.kind {
            *status = ReminderStatus::Complete;
        }
        assert_eq!(
            item.display_status(now.date()),
            Status::Reminder(ReminderStatus::Complete)
        );
    }

    #[test]
    fn recurring_reminder_displays_its_frequency() {
        let now = at(2026, 3, 10);
        let mut item = Item::new_reminder("water plants", Uuid::new_v4(), None, now);
        if let ItemKind::Reminder { recurrence, .. } = &mut item.kind {
            *recurrence = Some(crate::core::recurrence::Recurrence::new(Frequency::Weekly));
        }
        assert!(item.is_recurring());
        assert_eq!(
            item.display_status(now.date()),
            Status::Reminder(ReminderStatus::Weekly)
        );
    }

    #[test]
    fn trashed_and_complete_are_independent_axes() {
        let now = at(2026, 3, 10);
        let mut item = Item::new_task("file taxes", Uuid::new_v4(), now);
        assert!(item.is_active());
        if let ItemKind::Task { status, .. } = &mut item.kind {
            *status = TaskStatus::Complete;
        }
        assert!(item.is_complete() && !item.is_trashed());
        item.deleted_at = Some(now);
        assert!(item.is_complete() && item.is_trashed());
        assert!(!item.is_active());
    }

    #[test]
    fn kind_serializes_with_a_type_tag() {
        let now = at(2026, 3, 10);
        let item = Item::new_task("file taxes", Uuid::new_v4(), now);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "task");
        assert_eq!(json["status"], "start");
    }
}
