use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::core::item::Priority;
use crate::core::recurrence::{Frequency, Recurrence};
use crate::nl::date;
use crate::sync::gateway::ItemDraft;

static PRIORITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)!(?P<p>now|high|low)\b").unwrap());

static LIST_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(?P<name>[\w-]+)").unwrap());

static REMIND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*remind(\s+me)?(\s+to)?\b").unwrap());

static RECUR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:every\s+(?P<n>\d+)\s+(?P<unit>minutes?|hours?|days?|weeks?|months?|years?)|every\s+(?P<unit2>minute|hour|day|week|month|year)|(?P<word>hourly|daily|weekly|monthly|yearly))\b",
    )
    .unwrap()
});

/// Everything quick-add inferred from one line of free text.
#[derive(Debug, Clone)]
pub struct QuickAdd {
    pub title: String,
    /// Reminder when a date, recurrence, or "remind" phrasing was found.
    pub is_reminder: bool,
    pub reminder_date: Option<NaiveDateTime>,
    pub recurrence: Option<Recurrence>,
    pub priority: Priority,
    /// Referenced list name, resolved against the caller's known lists.
    pub list_name: Option<String>,
}

impl QuickAdd {
    pub fn into_draft(self, list_id: Uuid) -> ItemDraft {
        let draft = if self.is_reminder {
            let mut draft = ItemDraft::reminder(self.title, list_id, self.reminder_date);
            if let Some(recurrence) = self.recurrence {
                draft = draft.with_recurrence(recurrence);
            }
            draft
        } else {
            ItemDraft::task(self.title, list_id)
        };
        draft.with_priority(self.priority)
    }
}

/// Parse a quick-add line: `!now|!high|!low` priority tokens, `#list`
/// references, recurrence phrases ("every 3 days", "weekly at 9"), and a
/// date/time via the natural-language date parser. Whatever is not consumed
/// becomes the title.
pub fn parse_quick_add(text: &str, now: NaiveDateTime, list_names: &[String]) -> QuickAdd {
    let mut working = text.to_string();
    let mut is_reminder = false;

    let mut priority = Priority::Low;
    if let Some(caps) = PRIORITY_RE.captures(&working) {
        priority = match caps["p"].to_lowercase().as_str() {
            "now" => Priority::Now,
            "high" => Priority::High,
            _ => Priority::Low,
        };
        let span = caps.get(0).unwrap();
        let range = (span.start(), span.end());
        date::blank(&mut working, range);
    }

    let mut list_name = None;
    if let Some(caps) = LIST_RE.captures(&working) {
        let wanted = caps["name"].to_lowercase();
        if let Some(known) = list_names.iter().find(|n| n.to_lowercase() == wanted) {
            list_name = Some(known.clone());
            let span = caps.get(0).unwrap();
            let range = (span.start(), span.end());
            date::blank(&mut working, range);
        }
    }

    if let Some(m) = REMIND_RE.find(&working) {
        is_reminder = true;
        let range = (m.start(), m.end());
        date::blank(&mut working, range);
    }

    let mut recurrence = None;
    if let Some(caps) = RECUR_RE.captures(&working) {
        let frequency = caps
            .name("unit")
            .or_else(|| caps.name("unit2"))
            .and_then(|u| frequency_for_unit(u.as_str()))
            .or_else(|| caps.name("word").and_then(|w| Frequency::from_str(&w.as_str().to_lowercase())));
        if let Some(frequency) = frequency {
            let span = caps.get(0).unwrap();
            let mut rule = Recurrence::new(frequency);
            rule.interval = caps.name("n").and_then(|n| n.as_str().parse().ok());
            rule.source_text = span.as_str().trim().to_string();
            recurrence = Some(rule);
            is_reminder = true;
            let range = (span.start(), span.end());
            date::blank(&mut working, range);
        }
    }

    let mut reminder_date = None;
    if let Some(scan) = date::scan(&working, now) {
        for span in &scan.spans {
            date::blank(&mut working, *span);
        }
        match &mut recurrence {
            // "daily at 9" carries its clock time on the rule, not a date.
            Some(rule) => rule.time_of_day = Some(scan.date.time()),
            None => {
                reminder_date = Some(scan.date);
                is_reminder = true;
            }
        }
    }

    QuickAdd {
        title: tidy_title(&working),
        is_reminder,
        reminder_date,
        recurrence,
        priority,
        list_name,
    }
}

fn frequency_for_unit(unit: &str) -> Option<Frequency> {
    let unit = unit.to_lowercase();
    if unit.starts_with("minute") {
        Some(Frequency::Minutely)
    } else if unit.starts_with("hour") {
        Some(Frequency::Hourly)
    } else if unit.starts_with("day") {
        Some(Frequency::Daily)
    } else if unit.starts_with("week") {
        Some(Frequency::Weekly)
    } else if unit.starts_with("month") {
        Some(Frequency::Monthly)
    } else if unit.starts_with("year") {
        Some(Frequency::Yearly)
    } else {
        None
    }
}

fn tidy_title(working: &str) -> String {
    let collapsed = working.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| c == ',' || c == ';' || c == '.' || c.is_whitespace())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn remind_phrasing_with_a_date_becomes_a_dated_reminder() {
        let parsed = parse_quick_add("remind me to call mom tomorrow at 5", now(), &[]);
        assert!(parsed.is_reminder);
        assert_eq!(parsed.title, "call mom");
        assert_eq!(
            parsed.reminder_date,
            Some(NaiveDate::from_ymd_opt(2026, 3, 11).unwrap().and_hms_opt(17, 0, 0).unwrap())
        );
        assert!(parsed.recurrence.is_none());
    }

    #[test]
    fn recurrence_phrases_build_a_rule_with_time_of_day() {
        let parsed = parse_quick_add("water the plants every 3 days at 8am", now(), &[]);
        assert!(parsed.is_reminder);
        assert_eq!(parsed.title, "water the plants");
        let rule = parsed.recurrence.unwrap();
        assert_eq!(rule.frequency, Frequency::Daily);
        assert_eq!(rule.interval, Some(3));
        assert_eq!(rule.time_of_day, Some(chrono::NaiveTime::from_hms_opt(8, 0, 0).unwrap()));
        assert_eq!(rule.source_text, "every 3 days");
        // The clock time belongs to the rule, not a one-shot date.
        assert!(parsed.reminder_date.is_none());
    }

    #[test]
    fn frequency_words_work_on_their_own() {
        let parsed = parse_quick_add("pay rent monthly", now(), &[]);
        assert_eq!(parsed.title, "pay rent");
        assert_eq!(parsed.recurrence.unwrap().frequency, Frequency::Monthly);
    }

    #[test]
    fn priority_and_list_tokens_are_consumed() {
        let lists = vec!["Groceries".to_string(), "Work".to_string()];
        let parsed = parse_quick_add("buy milk !high #groceries", now(), &lists);
        assert!(!parsed.is_reminder);
        assert_eq!(parsed.title, "buy milk");
        assert_eq!(parsed.priority, Priority::High);
        assert_eq!(parsed.list_name.as_deref(), Some("Groceries"));
    }

    #[test]
    fn unknown_list_references_stay_in_the_title() {
        let parsed = parse_quick_add("buy milk #nosuchlist", now(), &[]);
        assert_eq!(parsed.title, "buy milk #nosuchlist");
        assert!(parsed.list_name.is_none());
    }

    #[test]
    fn plain_text_is_a_low_priority_task() {
        let parsed = parse_quick_add("write the quarterly report", now(), &[]);
        assert!(!parsed.is_reminder);
        assert_eq!(parsed.title, "write the quarterly report");
        assert_eq!(parsed.priority, Priority::Low);
        assert!(parsed.reminder_date.is_none());
    }

    #[test]
    fn drafts_carry_the_inferred_shape() {
        let list_id = Uuid::new_v4();
        let draft = parse_quick_add("remind me to stretch daily at 7", now(), &[]).into_draft(list_id);
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["type"], "reminder");
        assert_eq!(json["recurrence"]["frequency"], "daily");
    }
}
