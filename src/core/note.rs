use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A note's content can carry a hold directive instead of narrative text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldDirective {
    On,
    Off,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub content: String,
    pub timestamp: NaiveDateTime,
}

impl Note {
    pub fn new(content: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            timestamp,
        }
    }

    /// Reserved convention: content starting with "on hold" puts the item on
    /// hold, content that is exactly "off hold" releases it.
    pub fn hold_directive(&self) -> Option<HoldDirective> {
        let text = self.content.trim().to_lowercase();
        if text == "off hold" {
            Some(HoldDirective::Off)
        } else if text.starts_with("on hold") {
            Some(HoldDirective::On)
        } else {
            None
        }
    }

    /// Whether this note is a status flag rather than narrative text.
    pub fn is_flag(&self) -> bool {
        self.hold_directive().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn note(content: &str) -> Note {
        let ts = NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        Note::new(content, ts)
    }

    #[test]
    fn on_hold_prefix_is_a_directive() {
        assert_eq!(note("on hold until the parts arrive").hold_directive(), Some(HoldDirective::On));
        assert_eq!(note("On Hold").hold_directive(), Some(HoldDirective::On));
    }

    #[test]
    fn off_hold_must_match_exactly() {
        assert_eq!(note("off hold").hold_directive(), Some(HoldDirective::Off));
        assert_eq!(note("off hold now").hold_directive(), None);
    }

    #[test]
    fn narrative_text_is_not_a_directive() {
        assert_eq!(note("called the plumber, waiting on a quote").hold_directive(), None);
    }
}
