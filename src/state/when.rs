//! Day-reference resolution
//!
//! Turns the free-text answers people give to "when do you want to play?"
//! into a concrete date. Understood forms: `today`, `tomorrow`,
//! `weekend` / `this weekend` (nearest Saturday or Sunday, today included
//! when it already is one), `next week` (seven days out), a weekday name
//! (next occurrence, always in the future), and an ISO `YYYY-MM-DD` date.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Resolve a day reference against `today`. Returns None when the text
/// carries no recognizable day token.
pub fn resolve_day_reference(input: &str, today: NaiveDate) -> Option<NaiveDate> {
    let text = input.trim().to_lowercase();

    if let Some(date) = find_iso_date(&text) {
        return Some(date);
    }

    if text.contains("today") || text.contains("tonight") {
        return Some(today);
    }
    if text.contains("tomorrow") {
        return Some(today + Duration::days(1));
    }
    if text.contains("next week") {
        return Some(today + Duration::days(7));
    }
    if text.contains("weekend") {
        return Some(nearest_weekend_day(today));
    }

    if let Some(weekday) = find_weekday(&text) {
        return Some(next_occurrence(today, weekday));
    }

    None
}

/// Nearest Saturday or Sunday, counting today itself.
fn nearest_weekend_day(today: NaiveDate) -> NaiveDate {
    (0..7)
        .map(|offset| today + Duration::days(offset))
        .find(|date| matches!(date.weekday(), Weekday::Sat | Weekday::Sun))
        .unwrap_or(today)
}

/// Next occurrence of `weekday` strictly after today.
fn next_occurrence(today: NaiveDate, weekday: Weekday) -> NaiveDate {
    let current = today.weekday().num_days_from_monday() as i64;
    let target = weekday.num_days_from_monday() as i64;
    let mut offset = (target - current).rem_euclid(7);
    if offset == 0 {
        offset = 7;
    }
    today + Duration::days(offset)
}

fn find_weekday(text: &str) -> Option<Weekday> {
    const NAMES: [(&str, Weekday); 7] = [
        ("monday", Weekday::Mon),
        ("tuesday", Weekday::Tue),
        ("wednesday", Weekday::Wed),
        ("thursday", Weekday::Thu),
        ("friday", Weekday::Fri),
        ("saturday", Weekday::Sat),
        ("sunday", Weekday::Sun),
    ];

    NAMES
        .iter()
        .find(|(name, _)| text.contains(name))
        .map(|(_, weekday)| *weekday)
}

fn find_iso_date(text: &str) -> Option<NaiveDate> {
    for (index, _) in text.match_indices('-') {
        // A dash at this position could be the first dash of YYYY-MM-DD
        let Some(start) = index.checked_sub(4) else {
            continue;
        };
        let Some(candidate) = text.get(start..start + 10) else {
            continue;
        };
        if let Ok(date) = NaiveDate::parse_from_str(candidate, "%Y-%m-%d") {
            return Some(date);
        }
    }
    None
}
