use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Coarse time-relative category a reminder's display status derives from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Today,
    Within7,
    #[serde(rename = "7plus")]
    SevenPlus,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Within7 => "within7",
            Self::SevenPlus => "7plus",
        }
    }
}

/// Bucket a reminder date relative to `today`.
///
/// Overdue dates fold into `today` rather than a separate overdue bucket.
/// Undated reminders land in `within7` so they stay visible.
/// Never stored as truth — always recomputed from the date on read.
pub fn bucket_for_date(date: Option<NaiveDateTime>, today: NaiveDate) -> Bucket {
    let Some(date) = date else {
        return Bucket::Within7;
    };
    let days = (date.date() - today).num_days();
    if days <= 0 {
        Bucket::Today
    } else if days <= 7 {
        Bucket::Within7
    } else {
        Bucket::SevenPlus
    }
}
