use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How often a recurring reminder fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minutely => "minutely",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "minutely" => Some(Self::Minutely),
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }

    /// Whether an explicit interval ("every 3 days") makes sense for this frequency.
    pub fn supports_interval(&self) -> bool {
        matches!(self, Self::Minutely | Self::Hourly | Self::Daily | Self::Weekly)
    }
}

/// A reminder's recurrence rule, as inferred from natural-language capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    pub frequency: Frequency,
    /// Step count for interval-based frequencies ("every 3 days" = 3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    /// Clock time the reminder fires at, when one was given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<NaiveTime>,
    /// The natural-language text the rule was matched from.
    #[serde(default)]
    pub source_text: String,
}

impl Recurrence {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: None,
            time_of_day: None,
            source_text: String::new(),
        }
    }

    /// Compute the next occurrence strictly after `after`.
    pub fn next_occurrence(&self, after: NaiveDateTime) -> NaiveDateTime {
        let step = self.interval.unwrap_or(1).max(1);
        let stepped = match self.frequency {
            Frequency::Minutely => after + Duration::minutes(step as i64),
            Frequency::Hourly => after + Duration::hours(step as i64),
            Frequency::Daily => after + Duration::days(step as i64),
            Frequency::Weekly => after + Duration::weeks(step as i64),
            Frequency::Monthly => add_months(after.date(), step).and_time(after.time()),
            Frequency::Yearly => add_months(after.date(), step * 12).and_time(after.time()),
        };
        match self.time_of_day {
            // Pin day-granular rules to their clock time.
            Some(time) if self.frequency >= Frequency::Daily => stepped.date().and_time(time),
            _ => stepped,
        }
    }

    /// "HH:MM" label used to order recurring reminders within a frequency.
    pub fn time_label(&self) -> String {
        self.time_of_day
            .map(|t| t.format("%H:%M").to_string())
            .unwrap_or_default()
    }
}

pub(crate) fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let total_months = date.month0() + months;
    let new_year = date.year() + (total_months / 12) as i32;
    let new_month = (total_months % 12) + 1;
    // Clamp day to valid range for the new month
    let max_day = days_in_month(new_year, new_month);
    let new_day = date.day().min(max_day);
    NaiveDate::from_ymd_opt(new_year, new_month, new_day).unwrap_or(date)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    NaiveDate::from_ymd_opt(
        if month == 12 { year + 1 } else { year },
        if month == 12 { 1 } else { month + 1 },
        1,
    )
    .unwrap()
    .pred_opt()
    .unwrap()
    .day()
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.source_text.is_empty() {
            return write!(f, "{}", self.source_text);
        }
        match self.interval {
            Some(n) if n > 1 => write!(f, "every {} {}s", n, unit_name(self.frequency))?,
            _ => write!(f, "{}", self.frequency.as_str())?,
        }
        if let Some(time) = self.time_of_day {
            write!(f, " at {}", time.format("%H:%M"))?;
        }
        Ok(())
    }
}

fn unit_name(frequency: Frequency) -> &'static str {
    match frequency {
        Frequency::Minutely => "minute",
        Frequency::Hourly => "hour",
        Frequency::Daily => "day",
        Frequency::Weekly => "week",
        Frequency::Monthly => "month",
        Frequency::Yearly => "year",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn daily_steps_one_day() {
        let r = Recurrence::new(Frequency::Daily);
        assert_eq!(r.next_occurrence(at(2026, 2, 5, 9, 0)), at(2026, 2, 6, 9, 0));
    }

    #[test]
    fn interval_multiplies_the_step() {
        let mut r = Recurrence::new(Frequency::Weekly);
        r.interval = Some(2);
        assert_eq!(r.next_occurrence(at(2026, 2, 1, 9, 0)), at(2026, 2, 15, 9, 0));
    }

    #[test]
    fn monthly_clamps_to_month_end() {
        let r = Recurrence::new(Frequency::Monthly);
        assert_eq!(r.next_occurrence(at(2026, 1, 31, 9, 0)), at(2026, 2, 28, 9, 0));
    }

    #[test]
    fn time_of_day_pins_daily_occurrences() {
        let mut r = Recurrence::new(Frequency::Daily);
        r.time_of_day = Some(NaiveTime::from_hms_opt(7, 30, 0).unwrap());
        assert_eq!(r.next_occurrence(at(2026, 2, 5, 22, 15)), at(2026, 2, 6, 7, 30));
    }

    #[test]
    fn time_of_day_ignored_for_hourly() {
        let mut r = Recurrence::new(Frequency::Hourly);
        r.time_of_day = Some(NaiveTime::from_hms_opt(7, 30, 0).unwrap());
        assert_eq!(r.next_occurrence(at(2026, 2, 5, 22, 15)), at(2026, 2, 5, 23, 15));
    }

    #[test]
    fn display_prefers_source_text() {
        let mut r = Recurrence::new(Frequency::Daily);
        r.source_text = "every morning".to_string();
        assert_eq!(r.to_string(), "every morning");
    }
}
