use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::recurrence::add_months;

/// Time a day-only phrase resolves to.
const DEFAULT_MORNING: (u32, u32) = (9, 0);
/// Time "tonight" resolves to when no clock time is given.
const TONIGHT: (u32, u32) = (20, 0);

static ISO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?P<y>\d{4})-(?P<m>\d{2})-(?P<d>\d{2})\b").unwrap());

static MONTH_DAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?P<mon>jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(?P<d>\d{1,2})(?:st|nd|rd|th)?\b",
    )
    .unwrap()
});

static DAY_MONTH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?P<d>\d{1,2})(?:st|nd|rd|th)?\s+(?P<mon>jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\b",
    )
    .unwrap()
});

static SLASH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?P<m>\d{1,2})/(?P<d>\d{1,2})(?:/(?P<y>\d{2,4}))?\b").unwrap());

static RELATIVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?P<word>today|tonight|tomorrow)\b").unwrap());

static WEEKDAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:(?P<next>next)\s+)?(?P<day>monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b",
    )
    .unwrap()
});

static IN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bin\s+(?P<n>\d+)\s+(?P<unit>minutes?|mins?|hours?|hrs?|days?|weeks?|months?)\b")
        .unwrap()
});

static CLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:at\s+(?P<h1>\d{1,2})(?::(?P<min1>\d{2}))?\s*(?P<ap1>am|pm)?|(?P<h2>\d{1,2}):(?P<min2>\d{2})\s*(?P<ap2>am|pm)?|(?P<h3>\d{1,2})\s*(?P<ap3>am|pm))\b",
    )
    .unwrap()
});

static NOON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?P<word>noon|midday|midnight)\b").unwrap());

/// One extracted point in time, with the text it was matched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateMatch {
    pub text: String,
    pub date: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub(crate) struct ScanResult {
    pub date: NaiveDateTime,
    /// Byte spans the date/time phrases occupied, for callers that strip
    /// them out of a captured title.
    pub spans: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, Copy)]
struct DayPart {
    date: NaiveDate,
    span: (usize, usize),
    evening: bool,
}

#[derive(Debug, Clone, Copy)]
struct TimePart {
    hour: u32,
    minute: u32,
    meridiem: Option<Meridiem>,
    span: (usize, usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Meridiem {
    Am,
    Pm,
}

/// Extract a single point in time from free text, or `None` when the text
/// carries no date or time at all.
///
/// A bare hour is disambiguated: 1–7 defaults to PM, 8–11 to AM unless that
/// already passed today (then PM), 12 means noon. A resolved time that is
/// already past — with no explicit day given — rolls forward to tomorrow.
pub fn parse_date(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    scan(text, now).map(|s| s.date)
}

/// Every date mention in the text, in order of appearance.
pub fn parse_all(text: &str, now: NaiveDateTime) -> Vec<DateMatch> {
    let days = find_days(text, now.date());
    if days.is_empty() {
        return scan(text, now)
            .map(|s| {
                let (start, end) = s.spans.first().copied().unwrap_or((0, 0));
                vec![DateMatch { text: text[start..end].to_string(), date: s.date }]
            })
            .unwrap_or_default();
    }

    // One shared clock time applies to each mentioned day.
    let mut masked = text.to_string();
    for day in &days {
        blank(&mut masked, day.span);
    }
    let time = find_time(&masked);

    days.into_iter()
        .map(|day| {
            let date = combine(Some(day), time, now);
            DateMatch { text: text[day.span.0..day.span.1].to_string(), date }
        })
        .collect()
}

pub(crate) fn scan(text: &str, now: NaiveDateTime) -> Option<ScanResult> {
    // "in N units" is fully explicit: no meridiem inference, no rolling.
    if let Some(caps) = IN_RE.captures(text) {
        let whole = caps.get(0).unwrap();
        let n: i64 = caps["n"].parse().ok()?;
        let unit = caps["unit"].to_lowercase();
        let date = if unit.starts_with("min") {
            now + Duration::minutes(n)
        } else if unit.starts_with('h') {
            now + Duration::hours(n)
        } else if unit.starts_with("day") {
            now + Duration::days(n)
        } else if unit.starts_with("week") {
            now + Duration::weeks(n)
        } else {
            add_months(now.date(), n as u32).and_time(now.time())
        };
        return Some(ScanResult { date, spans: vec![(whole.start(), whole.end())] });
    }

    let day = find_days(text, now.date()).into_iter().next();
    let mut masked = text.to_string();
    if let Some(day) = &day {
        blank(&mut masked, day.span);
    }
    let time = find_time(&masked);

    if day.is_none() && time.is_none() {
        return None;
    }
    let mut spans = Vec::new();
    if let Some(day) = &day {
        spans.push(day.span);
    }
    if let Some(time) = &time {
        spans.push(time.span);
    }
    Some(ScanResult { date: combine(day, time, now), spans })
}

fn combine(day: Option<DayPart>, time: Option<TimePart>, now: NaiveDateTime) -> NaiveDateTime {
    match (day, time) {
        (Some(day), Some(time)) => {
            let resolved = resolve_time(time, day.date, now);
            day.date.and_time(resolved)
        }
        (Some(day), None) => {
            let (h, m) = if day.evening { TONIGHT } else { DEFAULT_MORNING };
            day.date.and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default())
        }
        (None, Some(time)) => {
            let resolved = resolve_time(time, now.date(), now);
            let candidate = now.date().and_time(resolved);
            if candidate <= now {
                // No explicit day given and the time already passed: tomorrow.
                candidate + Duration::days(1)
            } else {
                candidate
            }
        }
        (None, None) => now,
    }
}

/// Apply the bare-hour refinement: 1–7 → PM, 8–11 → AM unless already past
/// today, 12 → noon. Hours 0 and 13–23 are taken as 24h time.
fn resolve_time(time: TimePart, target_day: NaiveDate, now: NaiveDateTime) -> NaiveTime {
    let TimePart { hour, minute, meridiem, .. } = time;
    let hour = match meridiem {
        Some(Meridiem::Am) => hour % 12,
        Some(Meridiem::Pm) => hour % 12 + 12,
        None => {
            if hour == 12 {
                12
            } else if (1..=7).contains(&hour) {
                hour + 12
            } else if (8..=11).contains(&hour) {
                let as_morning = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default();
                if target_day == now.date() && as_morning <= now.time() {
                    hour + 12
                } else {
                    hour
                }
            } else {
                hour
            }
        }
    };
    NaiveTime::from_hms_opt(hour % 24, minute, 0).unwrap_or_default()
}

/// All day mentions in the text, ordered by position.
fn find_days(text: &str, today: NaiveDate) -> Vec<DayPart> {
    let mut days: Vec<DayPart> = Vec::new();

    for caps in ISO_RE.captures_iter(text) {
        let (Ok(y), Ok(m), Ok(d)) =
            (caps["y"].parse(), caps["m"].parse(), caps["d"].parse())
        else {
            continue;
        };
        if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
            days.push(day_part(date, caps.get(0).unwrap()));
        }
    }

    for caps in MONTH_DAY_RE.captures_iter(text) {
        if let Some(date) = month_day(&caps["mon"], &caps["d"], today) {
            days.push(day_part(date, caps.get(0).unwrap()));
        }
    }
    for caps in DAY_MONTH_RE.captures_iter(text) {
        if let Some(date) = month_day(&caps["mon"], &caps["d"], today) {
            days.push(day_part(date, caps.get(0).unwrap()));
        }
    }

    for caps in SLASH_RE.captures_iter(text) {
        let (Ok(m), Ok(d)) = (caps["m"].parse::<u32>(), caps["d"].parse::<u32>()) else {
            continue;
        };
        let year = match caps.name("y") {
            Some(y) => {
                let raw: i32 = match y.as_str().parse() {
                    Ok(v) => v,
                    Err(_) => continue,
                };
                if raw < 100 { raw + 2000 } else { raw }
            }
            None => today.year(),
        };
        let Some(mut date) = NaiveDate::from_ymd_opt(year, m, d) else {
            continue;
        };
        if caps.name("y").is_none() && date < today {
            date = NaiveDate::from_ymd_opt(year + 1, m, d).unwrap_or(date);
        }
        days.push(day_part(date, caps.get(0).unwrap()));
    }

    for caps in RELATIVE_RE.captures_iter(text) {
        let word = caps["word"].to_lowercase();
        let date = if word == "tomorrow" { today + Duration::days(1) } else { today };
        let mut part = day_part(date, caps.get(0).unwrap());
        part.evening = word == "tonight";
        days.push(part);
    }

    for caps in WEEKDAY_RE.captures_iter(text) {
        let Some(weekday) = weekday_from(&caps["day"]) else {
            continue;
        };
        let base = (weekday.num_days_from_monday() as i64
            - today.weekday().num_days_from_monday() as i64)
            .rem_euclid(7);
        let ahead = if caps.name("next").is_some() {
            if base == 0 { 7 } else { base + 7 }
        } else {
            base
        };
        days.push(day_part(today + Duration::days(ahead), caps.get(0).unwrap()));
    }

    days.sort_by_key(|d| d.span.0);
    // Overlapping matches (e.g. "5 jan" inside "jan 5 jan") keep the first.
    days.dedup_by(|b, a| b.span.0 < a.span.1);
    days
}

fn day_part(date: NaiveDate, m: regex::Match<'_>) -> DayPart {
    DayPart { date, span: (m.start(), m.end()), evening: false }
}

fn month_day(mon: &str, day: &str, today: NaiveDate) -> Option<NaiveDate> {
    let month = match &mon.to_lowercase()[..3] {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    let day: u32 = day.parse().ok()?;
    let date = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if date < today {
        // A bare month/day in the past means next year.
        NaiveDate::from_ymd_opt(today.year() + 1, month, day)
    } else {
        Some(date)
    }
}

fn weekday_from(name: &str) -> Option<Weekday> {
    match name.to_lowercase().as_str() {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

fn find_time(text: &str) -> Option<TimePart> {
    if let Some(caps) = NOON_RE.captures(text) {
        let m = caps.get(0).unwrap();
        let (hour, meridiem) = match caps["word"].to_lowercase().as_str() {
            "midnight" => (12, Some(Meridiem::Am)),
            _ => (12, Some(Meridiem::Pm)),
        };
        return Some(TimePart { hour, minute: 0, meridiem, span: (m.start(), m.end()) });
    }

    for caps in CLOCK_RE.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let hour_cap = caps.name("h1").or_else(|| caps.name("h2")).or_else(|| caps.name("h3"));
        let minute_cap = caps.name("min1").or_else(|| caps.name("min2"));
        let ap_cap = caps
            .name("ap1")
            .or_else(|| caps.name("ap2"))
            .or_else(|| caps.name("ap3"));

        let Some(hour) = hour_cap.and_then(|h| h.as_str().parse::<u32>().ok()) else {
            continue;
        };
        let minute = minute_cap.and_then(|v| v.as_str().parse::<u32>().ok()).unwrap_or(0);
        if hour > 23 || minute > 59 {
            continue;
        }
        let meridiem = ap_cap.map(|ap| {
            if ap.as_str().eq_ignore_ascii_case("pm") { Meridiem::Pm } else { Meridiem::Am }
        });
        return Some(TimePart { hour, minute, meridiem, span: (m.start(), m.end()) });
    }
    None
}

/// Blank a byte span with spaces, preserving every other offset.
pub(crate) fn blank(text: &mut String, span: (usize, usize)) {
    // Matches come from ASCII-only patterns, so the span edges are safe.
    let replacement = " ".repeat(span.1 - span.0);
    text.replace_range(span.0..span.1, &replacement);
}

#[cfg(test)]
mod tests {
    use super::*;

    // A Tuesday.
    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn bare_low_hours_default_to_pm() {
        assert_eq!(parse_date("call mom tomorrow at 5", now()), Some(at(2026, 3, 11, 17, 0)));
    }

    #[test]
    fn bare_morning_hours_default_to_am() {
        assert_eq!(parse_date("standup at 10", now()), Some(at(2026, 3, 10, 10, 0)));
    }

    #[test]
    fn passed_morning_hour_flips_to_pm() {
        let late = at(2026, 3, 10, 11, 0);
        assert_eq!(parse_date("review at 10", late), Some(at(2026, 3, 10, 22, 0)));
    }

    #[test]
    fn twelve_means_noon() {
        assert_eq!(parse_date("lunch at 12", now()), Some(at(2026, 3, 10, 12, 0)));
    }

    #[test]
    fn past_time_with_no_day_rolls_to_tomorrow() {
        let evening = at(2026, 3, 10, 18, 0);
        // 5 → 17:00 has passed; roll forward a day.
        assert_eq!(parse_date("gym at 5", evening), Some(at(2026, 3, 11, 17, 0)));
    }

    #[test]
    fn an_explicit_day_never_rolls() {
        let evening = at(2026, 3, 10, 18, 0);
        assert_eq!(parse_date("gym today at 5", evening), Some(at(2026, 3, 10, 17, 0)));
    }

    #[test]
    fn weekday_names_pick_the_next_occurrence() {
        assert_eq!(parse_date("review friday", now()), Some(at(2026, 3, 13, 9, 0)));
        assert_eq!(parse_date("review next friday", now()), Some(at(2026, 3, 20, 9, 0)));
        // Today's own name means today.
        assert_eq!(parse_date("review tuesday", now()), Some(at(2026, 3, 10, 9, 0)));
    }

    #[test]
    fn tonight_defaults_to_the_evening() {
        assert_eq!(parse_date("take out bins tonight", now()), Some(at(2026, 3, 10, 20, 0)));
    }

    #[test]
    fn relative_offsets_are_exact() {
        assert_eq!(parse_date("check oven in 2 hours", now()), Some(at(2026, 3, 10, 11, 0)));
        assert_eq!(parse_date("follow up in 3 days", now()), Some(at(2026, 3, 13, 9, 0)));
    }

    #[test]
    fn explicit_dates_parse() {
        assert_eq!(parse_date("renew on 2026-04-02", now()), Some(at(2026, 4, 2, 9, 0)));
        assert_eq!(parse_date("party mar 25", now()), Some(at(2026, 3, 25, 9, 0)));
        assert_eq!(parse_date("party 25 march at 6pm", now()), Some(at(2026, 3, 25, 18, 0)));
    }

    #[test]
    fn past_month_days_land_next_year() {
        assert_eq!(parse_date("taxes jan 5", now()), Some(at(2027, 1, 5, 9, 0)));
    }

    #[test]
    fn no_date_yields_none() {
        assert_eq!(parse_date("buy more coffee", now()), None);
    }

    #[test]
    fn parse_all_returns_every_mention() {
        let matches = parse_all("dentist tomorrow, haircut friday", now());
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].text, "tomorrow");
        assert_eq!(matches[0].date, at(2026, 3, 11, 9, 0));
        assert_eq!(matches[1].text, "friday");
        assert_eq!(matches[1].date, at(2026, 3, 13, 9, 0));
    }
}
