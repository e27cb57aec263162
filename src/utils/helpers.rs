//! Helper functions and utilities
//!
//! Small formatting helpers shared by the command handlers and the dialogue
//! manager.

use chrono::{Datelike, NaiveDate, Weekday};

/// Format an hour from the booking grid for display
pub fn format_hour(hour: i32) -> String {
    format!("{:02}:00", hour)
}

/// Format a date with its weekday for display
pub fn format_day(date: NaiveDate) -> String {
    format!("{} {}", weekday_name(date.weekday()), date.format("%Y-%m-%d"))
}

/// English weekday name
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Truncate text to a maximum number of characters with ellipsis
pub fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_length.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hour() {
        assert_eq!(format_hour(8), "08:00");
        assert_eq!(format_hour(14), "14:00");
    }

    #[test]
    fn test_format_day() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(format_day(date), "Sunday 2025-06-01");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("a longer sentence", 10), "a longe...");
    }
}
