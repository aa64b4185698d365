use crate::models::{CanonicalQuery, FilterInput, TimestampValue};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Offset-less datetime layouts accepted for free-form timestamps, read as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Date-only layouts, taken as midnight UTC.
const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Builds the canonical query from raw filter values.
///
/// Never fails: missing text fields become `""` and missing or unparseable
/// timestamps become `"0"` (unbounded). Start/end ordering is passed through
/// unchecked; the server decides what an inverted range means.
pub fn normalize(filters: Option<&FilterInput>) -> CanonicalQuery {
    let default = FilterInput::default();
    let filters = filters.unwrap_or(&default);

    CanonicalQuery {
        log_type: text_or_empty(&filters.log_type),
        username: text_or_empty(&filters.username),
        token_name: text_or_empty(&filters.token_name),
        model_name: text_or_empty(&filters.model_name),
        start_timestamp: timestamp_seconds(&filters.start_timestamp).to_string(),
        end_timestamp: timestamp_seconds(&filters.end_timestamp).to_string(),
        channel: text_or_empty(&filters.channel),
        group: text_or_empty(&filters.group),
    }
}

fn text_or_empty(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Converts a timestamp value to whole Unix seconds, `0` when absent or invalid.
pub fn timestamp_seconds(value: &TimestampValue) -> i64 {
    match value {
        TimestampValue::Unset => 0,
        TimestampValue::Seconds(secs) => *secs,
        TimestampValue::Wallclock(instant) => floor_seconds(instant),
        TimestampValue::RawText(text) => parse_date_text(text)
            .map(|instant| floor_seconds(&instant))
            .unwrap_or(0),
    }
}

// Floor, not round: 1.999s is 1, -0.5s is -1.
fn floor_seconds(instant: &DateTime<Utc>) -> i64 {
    instant.timestamp_millis().div_euclid(1000)
}

/// Lenient date parser for user-supplied text. Returns `None` when no layout matches.
pub fn parse_date_text(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(text) {
        return Some(parsed.with_timezone(&Utc));
    }

    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NAIVE_DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}
