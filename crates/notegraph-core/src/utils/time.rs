use chrono::{DateTime, NaiveDate};
use serde_json::Value;

/// Parse a metadata date. Accepts `YYYY-MM-DD`, `YYYY/MM/DD` and RFC 3339
/// timestamps (only the date part is kept).
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    value.as_str().and_then(parse_date_str)
}

pub fn parse_date_str(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y/%m/%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.date_naive())
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
