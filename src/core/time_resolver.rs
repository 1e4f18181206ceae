//! Resolves "posted X ago" phrases from job boards into calendar dates.
//!
//! Rules are tried in a fixed order and the first match wins. Anything that
//! cannot be interpreted resolves to the reference date, so the resolver never
//! fails.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, TimeDelta};
use regex::Regex;
use std::sync::LazyLock;

static DATE_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})[/\-\s](\d{1,2})[/\-\s](\d{2,4})").unwrap());
static MINUTES_AGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*minute[s]?\s*ago").unwrap());
static HOURS_AGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*hour[s]?\s*ago").unwrap());
static DAYS_AGO: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*day[s]?\s*ago").unwrap());
static WEEKS_AGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*week[s]?\s*ago").unwrap());
static MONTHS_AGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*month[s]?\s*ago").unwrap());
static YEARS_AGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*year[s]?\s*ago").unwrap());

/// Gregorian leap year rule.
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Resolves `text` against `reference`.
pub fn resolve(text: &str, reference: NaiveDateTime) -> NaiveDate {
    let today = reference.date();

    let lowered = text.trim().to_lowercase();
    if lowered.is_empty() {
        return today;
    }
    let text = lowered
        .strip_prefix("posted")
        .map(str::trim)
        .unwrap_or(&lowered);

    if let Some(date) = literal_date(text) {
        return date;
    }

    if text.is_empty() || text.contains("today") || text.contains("just now") {
        return today;
    }

    if text.contains("yesterday") {
        return today.pred_opt().unwrap_or(today);
    }

    let timed: [(&Regex, fn(i64) -> Option<TimeDelta>); 4] = [
        (&*MINUTES_AGO, TimeDelta::try_minutes),
        (&*HOURS_AGO, TimeDelta::try_hours),
        (&*DAYS_AGO, TimeDelta::try_days),
        (&*WEEKS_AGO, TimeDelta::try_weeks),
    ];
    for (pattern, to_delta) in timed {
        if let Some(count) = captured_count(pattern, text) {
            return to_delta(count)
                .and_then(|delta| reference.checked_sub_signed(delta))
                .map(|instant| instant.date())
                .unwrap_or(today);
        }
    }

    if let Some(count) = captured_count(&MONTHS_AGO, text) {
        return months_back(today, count).unwrap_or(today);
    }

    if let Some(count) = captured_count(&YEARS_AGO, text) {
        return years_back(today, count).unwrap_or(today);
    }

    tracing::debug!("Unrecognized posted time '{}', using reference date", text);
    today
}

/// Resolves against the local wall clock.
pub fn resolve_now(text: &str) -> NaiveDate {
    resolve(text, Local::now().naive_local())
}

/// Accepts an ISO `YYYY-MM-DD` value as-is, otherwise resolves it as a
/// relative phrase. Used when reading posted dates back from CSV files.
pub fn resolve_posted_date(text: &str, reference: NaiveDateTime) -> NaiveDate {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").unwrap_or_else(|_| resolve(text, reference))
}

fn captured_count(pattern: &Regex, text: &str) -> Option<i64> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Day-month-year literal. Invalid calendar dates yield `None` so the caller
/// falls through to the relative rules.
fn literal_date(text: &str) -> Option<NaiveDate> {
    let caps = DATE_LITERAL.captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year_digits = &caps[3];
    let mut year: i32 = year_digits.parse().ok()?;
    if year_digits.len() == 2 {
        year += if year < 50 { 2000 } else { 1900 };
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn months_back(today: NaiveDate, months: i64) -> Option<NaiveDate> {
    // Equivalent to decrementing the month and rolling the year back while
    // the month is <= 0.
    let total = (today.year() as i64 * 12 + today.month0() as i64).checked_sub(months)?;
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = total.rem_euclid(12) as u32 + 1;
    let day = today.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
}

fn years_back(today: NaiveDate, years: i64) -> Option<NaiveDate> {
    let year = i32::try_from((today.year() as i64).checked_sub(years)?).ok()?;
    let day = if today.month() == 2 && today.day() == 29 && !is_leap_year(year) {
        28
    } else {
        today.day()
    };
    NaiveDate::from_ymd_opt(year, today.month(), day)
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

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_minutes_within_same_day() {
        assert_eq!(
            resolve("Posted 25 minutes ago", at(2024, 3, 10, 12, 0)),
            date(2024, 3, 10)
        );
    }

    #[test]
    fn test_minutes_and_hours_cross_midnight() {
        assert_eq!(
            resolve("30 minutes ago", at(2024, 3, 10, 0, 10)),
            date(2024, 3, 9)
        );
        assert_eq!(resolve("5 hours ago", at(2024, 3, 10, 3, 0)), date(2024, 3, 9));
        assert_eq!(resolve("1 hour ago", at(2024, 3, 10, 3, 0)), date(2024, 3, 10));
    }

    #[test]
    fn test_days_and_weeks() {
        let reference = at(2024, 3, 10, 9, 0);
        assert_eq!(resolve("3 days ago", reference), date(2024, 3, 7));
        assert_eq!(resolve("1 day ago", reference), date(2024, 3, 9));
        assert_eq!(resolve("2 weeks ago", reference), date(2024, 2, 25));
        assert_eq!(resolve("Reposted 1 week ago", reference), date(2024, 3, 3));
    }

    #[test]
    fn test_month_clamps_to_leap_february() {
        assert_eq!(resolve("1 month ago", at(2024, 3, 31, 8, 0)), date(2024, 2, 29));
        assert_eq!(resolve("1 month ago", at(2023, 3, 31, 8, 0)), date(2023, 2, 28));
    }

    #[test]
    fn test_month_clamps_to_thirty_day_month() {
        assert_eq!(resolve("1 month ago", at(2024, 5, 31, 8, 0)), date(2024, 4, 30));
    }

    #[test]
    fn test_months_cross_year_boundary() {
        assert_eq!(resolve("3 months ago", at(2024, 3, 31, 8, 0)), date(2023, 12, 31));
        assert_eq!(resolve("5 months ago", at(2024, 3, 15, 8, 0)), date(2023, 10, 15));
        assert_eq!(resolve("13 months ago", at(2024, 1, 15, 8, 0)), date(2022, 12, 15));
        assert_eq!(resolve("12 months ago", at(2024, 1, 15, 8, 0)), date(2023, 1, 15));
    }

    #[test]
    fn test_years_from_leap_day() {
        let reference = at(2024, 2, 29, 8, 0);
        assert_eq!(resolve("1 year ago", reference), date(2023, 2, 28));
        assert_eq!(resolve("4 years ago", reference), date(2020, 2, 29));
        assert_eq!(resolve("2 years ago", at(2024, 7, 1, 8, 0)), date(2022, 7, 1));
    }

    #[test]
    fn test_yesterday_variants() {
        let reference = at(2024, 1, 1, 8, 0);
        for text in ["yesterday", "Posted Yesterday", "  YESTERDAY ", "posted yesterday"] {
            assert_eq!(resolve(text, reference), date(2023, 12, 31), "{text}");
        }
    }

    #[test]
    fn test_today_variants_and_empty() {
        let reference = at(2024, 6, 5, 8, 0);
        for text in ["", "   ", "today", "Posted today", "Just now", "Posted"] {
            assert_eq!(resolve(text, reference), date(2024, 6, 5), "{text:?}");
        }
    }

    #[test]
    fn test_literal_dates() {
        let reference = at(2024, 6, 5, 8, 0);
        assert_eq!(resolve("15/01/2023", reference), date(2023, 1, 15));
        assert_eq!(resolve("Posted 3-11-2022", reference), date(2022, 11, 3));
        assert_eq!(resolve("15 01 2023", reference), date(2023, 1, 15));
    }

    #[test]
    fn test_two_digit_year_boundary() {
        let reference = at(2024, 6, 5, 8, 0);
        assert_eq!(resolve("15/01/49", reference), date(2049, 1, 15));
        assert_eq!(resolve("15/01/50", reference), date(1950, 1, 15));
    }

    #[test]
    fn test_malformed_literal_falls_through() {
        let reference = at(2024, 6, 5, 8, 0);
        assert_eq!(resolve("32/01/2023 2 days ago", reference), date(2024, 6, 3));
        assert_eq!(resolve("31/02/2024", reference), date(2024, 6, 5));
    }

    #[test]
    fn test_unrecognized_and_oversized_counts() {
        let reference = at(2024, 6, 5, 8, 0);
        assert_eq!(resolve("a while back", reference), date(2024, 6, 5));
        assert_eq!(
            resolve("99999999999999999999 days ago", reference),
            date(2024, 6, 5)
        );
        assert_eq!(resolve("9999999999 days ago", reference), date(2024, 6, 5));
        assert_eq!(resolve("9999999999 years ago", reference), date(2024, 6, 5));
    }

    #[test]
    fn test_resolve_posted_date_prefers_iso() {
        let reference = at(2024, 6, 5, 8, 0);
        assert_eq!(resolve_posted_date("2024-01-15", reference), date(2024, 1, 15));
        assert_eq!(resolve_posted_date("2 days ago", reference), date(2024, 6, 3));
    }

    #[test]
    fn test_leap_year_rule() {
        assert!(is_leap_year(2000));
        assert!(is_leap_year(2024));
        assert!(!is_leap_year(1900));
        assert!(!is_leap_year(2023));
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2100, 2), 28);
        assert_eq!(days_in_month(2024, 9), 30);
    }
}
