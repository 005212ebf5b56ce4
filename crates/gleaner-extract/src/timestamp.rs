//! Natural-language timestamp parsing.
//!
//! Feed timestamps arrive as anything from "2 hrs" to
//! "March 12, 2025 at 10:04 AM". Parsing is deterministic given the caller's
//! reference instant, which keeps extraction reproducible in tests.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Longest raw string worth attempting to parse.
const MAX_RAW_LEN: usize = 64;

static RELATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(\d{1,3})|an?)\s*(s|secs?|seconds?|m|mins?|minutes?|h|hrs?|hours?|d|days?|w|wks?|weeks?)$",
    )
    .expect("valid regex")
});

/// Datetime formats tried against the raw string as-is.
const DATETIME_FORMATS: [&str; 5] = [
    "%B %d, %Y at %I:%M %p",
    "%B %d, %Y %I:%M %p",
    "%d %B %Y at %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Datetime formats lacking a year ("March 12 at 10:04 AM"); the year is
/// borrowed from the reference instant.
const YEARLESS_FORMATS: [&str; 2] = ["%Y %B %d at %I:%M %p", "%Y %d %B at %H:%M"];

/// Date-only formats; time defaults to midnight.
const DATE_FORMATS: [&str; 4] = ["%B %d, %Y", "%d %B %Y", "%Y-%m-%d", "%m/%d/%Y"];

/// Parse a feed timestamp string relative to `now`.
///
/// Returns `None` for anything unparseable; a missing timestamp is a
/// normal extraction outcome, not an error.
#[must_use]
pub fn parse_human_timestamp(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.len() > MAX_RAW_LEN {
        return None;
    }

    let lower = raw.to_ascii_lowercase();
    let lower = lower
        .trim_end_matches(" ago")
        .trim_end_matches('.')
        .trim()
        .to_string();

    if lower == "just now" || lower == "now" {
        return Some(now);
    }

    if let Some(captures) = RELATIVE.captures(&lower) {
        let quantity: i64 = captures
            .get(1)
            .map_or(1, |m| m.as_str().parse().unwrap_or(1));
        let unit_secs = match &captures[2] {
            unit if unit.starts_with('s') => 1,
            unit if unit.starts_with('m') => 60,
            unit if unit.starts_with('h') => 3_600,
            unit if unit.starts_with('d') => 86_400,
            _ => 604_800,
        };
        return now.checked_sub_signed(Duration::seconds(quantity * unit_secs));
    }

    if let Some(rest) = lower.strip_prefix("yesterday") {
        return parse_yesterday(rest, now);
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
    }

    for format in YEARLESS_FORMATS {
        let with_year = format!("{} {raw}", now.format("%Y"));
        if let Ok(parsed) = NaiveDateTime::parse_from_str(&with_year, format) {
            let parsed = parsed.and_utc();
            // A yearless date slightly in the future belongs to last year.
            if parsed > now + Duration::days(1) {
                let last_year = format!("{} {raw}", (now - Duration::days(366)).format("%Y"));
                if let Ok(reparsed) = NaiveDateTime::parse_from_str(&last_year, format) {
                    return Some(reparsed.and_utc());
                }
            }
            return Some(parsed);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(raw, format) {
            return parsed.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    None
}

/// Parse the remainder of a "Yesterday[ at HH:MM]" string.
fn parse_yesterday(rest: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let date = (now - Duration::days(1)).date_naive();
    let rest = rest.trim().trim_start_matches("at").trim();

    if rest.is_empty() {
        return Some(date.and_time(now.time()).and_utc());
    }

    for format in ["%I:%M %p", "%H:%M"] {
        if let Ok(time) = NaiveTime::parse_from_str(rest, format) {
            return Some(date.and_time(time).and_utc());
        }
    }

    None
}
