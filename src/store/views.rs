use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::core::bucket::bucket_for_date;
use crate::core::item::{Item, ItemKind, ReminderStatus};
use crate::core::list::List;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Tasks,
    Reminders,
    Recurring,
    Trash,
    Complete,
}

/// Whether the UI groups items into fixed status columns or ad hoc
/// category sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Columns,
    Categories,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListSelection {
    All,
    List(Uuid),
}

impl ListSelection {
    pub fn matches(&self, list_id: Uuid) -> bool {
        match self {
            Self::All => true,
            Self::List(id) => *id == list_id,
        }
    }
}

/// The single projection the column/category UI renders against.
///
/// Pure: filters by view and list selection, recomputes reminder display
/// statuses from their dates (sticky `complete` aside), and applies the
/// per-view sort. Never mutates store state.
pub fn filtered_items(
    items: &[Item],
    lists: &[List],
    view: View,
    selection: ListSelection,
    today: NaiveDate,
) -> Vec<Item> {
    let mut out: Vec<Item> = items
        .iter()
        .filter(|item| selection.matches(item.list_id))
        .filter(|item| match view {
            View::Tasks => item.is_task() && item.is_active(),
            View::Reminders => item.is_reminder() && !item.is_recurring() && item.is_active(),
            View::Recurring => item.is_recurring() && item.is_active(),
            View::Trash => item.is_trashed(),
            View::Complete => item.is_complete() && !item.is_trashed(),
        })
        .cloned()
        .map(|item| enrich(item, today))
        .collect();

    match view {
        View::Tasks => {
            // Priority groups (now > high > low), original order within each
            // group; under "all", sub-sort each group by list display order.
            let list_order: HashMap<Uuid, usize> = lists
                .iter()
                .enumerate()
                .map(|(index, list)| (list.id, index))
                .collect();
            if selection == ListSelection::All {
                out.sort_by_key(|item| {
                    (item.priority, list_order.get(&item.list_id).copied().unwrap_or(usize::MAX))
                });
            } else {
                out.sort_by_key(|item| item.priority);
            }
        }
        View::Reminders => {
            // Ascending by reminder date, undated last.
            out.sort_by_key(|item| match item.reminder_date() {
                Some(date) => (0, date),
                None => (1, chrono::NaiveDateTime::MAX),
            });
        }
        View::Recurring => {
            // Within each frequency, ascending by time-of-day string.
            out.sort_by_key(|item| {
                item.recurrence()
                    .map(|r| (r.frequency, r.time_label()))
                    .unwrap_or((crate::core::recurrence::Frequency::Daily, String::new()))
            });
        }
        View::Trash => {
            out.sort_by_key(|item| std::cmp::Reverse(item.deleted_at));
        }
        View::Complete => {
            out.sort_by_key(|item| std::cmp::Reverse(item.updated_at));
        }
    }

    out
}

/// Recompute a reminder's stored status from its date for display; the
/// bucket is never the source of truth.
fn enrich(mut item: Item, today: NaiveDate) -> Item {
    if let ItemKind::Reminder { status, reminder_date, recurrence } = &mut item.kind {
        if !status.is_complete() {
            *status = match recurrence {
                Some(r) => ReminderStatus::from_frequency(r.frequency),
                None => ReminderStatus::from_bucket(bucket_for_date(*reminder_date, today)),
            };
        }
    }
    item
}
