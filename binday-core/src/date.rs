//! Council date parsing and relative day labels.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

/// Output format used in every public response.
pub const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";

const DAY_MONTH_YEAR: &str = "%d %B %Y";
const WEEKDAY_DAY_MONTH_YEAR: &str = "%A %d %B %Y";

static EMBEDDED_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,2}\s+\w+\s+\d{4}").expect("invalid regex: embedded date")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Written date conventions found in council markup.
pub enum DateStyle {
    /// `day MonthName year` somewhere inside a longer sentence.
    Embedded,
    /// The whole text is `Weekday day MonthName year`; the weekday must match.
    Weekday,
}

/// Parse a raw list-item text into a calendar date.
///
/// Returns `None` when the text does not contain a date in the given style.
#[must_use]
pub fn parse_collection_date(raw: &str, style: DateStyle) -> Option<NaiveDate> {
    match style {
        DateStyle::Embedded => {
            let found = EMBEDDED_DATE.find(raw)?;
            let normalized = collapse_whitespace(found.as_str());
            NaiveDate::parse_from_str(&normalized, DAY_MONTH_YEAR).ok()
        }
        DateStyle::Weekday => {
            let normalized = collapse_whitespace(raw);
            NaiveDate::parse_from_str(&normalized, WEEKDAY_DAY_MONTH_YEAR).ok()
        }
    }
}

/// Render a date as `DD/MM/YYYY`.
#[must_use]
pub fn format_display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

/// Whole calendar days from `today` to `date`; negative for past dates.
#[must_use]
pub fn days_until(date: NaiveDate, today: NaiveDate) -> i64 {
    date.signed_duration_since(today).num_days()
}

/// Human label for a collection date as seen from `today`.
#[must_use]
pub fn relative_label(date: NaiveDate, today: NaiveDate) -> String {
    match days_until(date, today) {
        0 => "today".to_owned(),
        1 => "tomorrow".to_owned(),
        days if days < 0 => format!("{} days ago", days.unsigned_abs()),
        days => format!("in {days} days"),
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn embedded_style_finds_date_inside_sentence() {
        let parsed = parse_collection_date(
            "Your next collection is Wednesday 14 January 2026 (provisional)",
            DateStyle::Embedded,
        );
        assert_eq!(parsed, Some(ymd(2026, 1, 14)));
    }

    #[test]
    fn embedded_style_accepts_single_digit_days() {
        let parsed = parse_collection_date("Monday 2 February 2026", DateStyle::Embedded);
        assert_eq!(parsed, Some(ymd(2026, 2, 2)));
    }

    #[test]
    fn embedded_style_rejects_text_without_date() {
        assert_eq!(
            parse_collection_date("No collection scheduled", DateStyle::Embedded),
            None
        );
        assert_eq!(
            parse_collection_date("14 Smarch 2026", DateStyle::Embedded),
            None
        );
    }

    #[test]
    fn weekday_style_parses_full_text() {
        let parsed = parse_collection_date("Wednesday  14 January\n 2026", DateStyle::Weekday);
        assert_eq!(parsed, Some(ymd(2026, 1, 14)));
    }

    #[test]
    fn weekday_style_rejects_inconsistent_weekday() {
        // 14 January 2026 is a Wednesday
        assert_eq!(
            parse_collection_date("Friday 14 January 2026", DateStyle::Weekday),
            None
        );
    }

    #[test]
    fn weekday_style_rejects_surrounding_text() {
        assert_eq!(
            parse_collection_date("Next: Wednesday 14 January 2026", DateStyle::Weekday),
            None
        );
    }

    #[test]
    fn display_format_is_day_month_year() {
        assert_eq!(format_display_date(ymd(2026, 1, 4)), "04/01/2026");
    }

    #[test]
    fn relative_labels_cover_every_offset() {
        let today = ymd(2026, 1, 10);
        assert_eq!(relative_label(ymd(2026, 1, 10), today), "today");
        assert_eq!(relative_label(ymd(2026, 1, 11), today), "tomorrow");
        assert_eq!(relative_label(ymd(2026, 1, 14), today), "in 4 days");
        assert_eq!(relative_label(ymd(2026, 1, 9), today), "1 days ago");
        assert_eq!(relative_label(ymd(2025, 12, 31), today), "10 days ago");
    }

    #[test]
    fn relative_label_crosses_year_boundary() {
        assert_eq!(relative_label(ymd(2027, 1, 1), ymd(2026, 12, 30)), "in 2 days");
    }
}
