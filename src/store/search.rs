use crate::core::item::Item;

/// Free-text search over active items: case-insensitive, every term must
/// match somewhere, results ordered by descending relevance. Title matches
/// weigh most (an exact phrase hit more still), note content less, and
/// date/time strings least. Deleted and completed items never match.
pub fn search_items(items: &[Item], query: &str) -> Vec<Item> {
    let phrase = query.trim().to_lowercase();
    if phrase.is_empty() {
        return Vec::new();
    }
    let terms: Vec<&str> = phrase.split_whitespace().collect();

    let mut scored: Vec<(i64, Item)> = Vec::new();
    for item in items {
        if !item.is_active() {
            continue;
        }
        let title = item.title.to_lowercase();
        let notes = item
            .notes
            .iter()
            .map(|n| n.content.to_lowercase())
            .collect::<Vec<_>>()
            .join("\n");
        let dates = date_strings(item);

        let mut score = 0i64;
        let mut all_matched = true;
        for term in &terms {
            let mut matched = false;
            if title.contains(term) {
                score += 10;
                matched = true;
            }
            if notes.contains(term) {
                score += 5;
                matched = true;
            }
            if dates.contains(term) {
                score += 2;
                matched = true;
            }
            if !matched {
                all_matched = false;
                break;
            }
        }
        if !all_matched {
            continue;
        }
        if terms.len() > 1 && title.contains(&phrase) {
            // Exact phrase in the title outranks scattered term hits.
            score += 25;
        }
        scored.push((score, item.clone()));
    }

    // Stable sort keeps insertion order for ties.
    scored.sort_by_key(|(score, _)| std::cmp::Reverse(*score));
    scored.into_iter().map(|(_, item)| item).collect()
}

fn date_strings(item: &Item) -> String {
    let mut out = String::new();
    if let Some(date) = item.reminder_date() {
        out.push_str(&date.format("%Y-%m-%d %H:%M %A %B").to_string().to_lowercase());
    }
    out.push(' ');
    out.push_str(&item.created_at.format("%Y-%m-%d").to_string());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::item::{ItemKind, TaskStatus};
    use crate::core::note::Note;
    use chrono::{NaiveDate, NaiveDateTime};
    use uuid::Uuid;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn task(title: &str) -> Item {
        Item::new_task(title, Uuid::new_v4(), now())
    }

    #[test]
    fn title_hits_outrank_note_hits() {
        let titled = task("buy groceries");
        let mut noted = task("errands");
        noted.notes.push(Note::new("remember the groceries", now()));
        let out = search_items(&[noted, titled], "groceries");
        assert_eq!(out[0].title, "buy groceries");
        assert_eq!(out[1].title, "errands");
    }

    #[test]
    fn every_term_must_match() {
        let item = task("buy groceries");
        assert!(search_items(std::slice::from_ref(&item), "buy milk").is_empty());
        assert_eq!(search_items(std::slice::from_ref(&item), "buy groceries").len(), 1);
    }

    #[test]
    fn phrase_match_boosts_over_scattered_terms() {
        let scattered = task("groceries to buy later");
        let phrase = task("other buy groceries");
        let out = search_items(&[scattered, phrase], "buy groceries");
        assert_eq!(out[0].title, "other buy groceries");
    }

    #[test]
    fn deleted_and_completed_items_never_match() {
        let mut trashed = task("buy groceries");
        trashed.deleted_at = Some(now());
        let mut done = task("buy groceries too");
        if let ItemKind::Task { status, .. } = &mut done.kind {
            *status = TaskStatus::Complete;
        }
        assert!(search_items(&[trashed, done], "groceries").is_empty());
    }

    #[test]
    fn date_strings_are_searchable() {
        let mut item = Item::new_reminder(
            "dentist",
            Uuid::new_v4(),
            Some(NaiveDate::from_ymd_opt(2026, 4, 2).unwrap().and_hms_opt(15, 0, 0).unwrap()),
            now(),
        );
        item.title = "checkup".into();
        let out = search_items(std::slice::from_ref(&item), "2026-04-02");
        assert_eq!(out.len(), 1);
    }
}
