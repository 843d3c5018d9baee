pub mod ad;
pub mod company;
pub mod user;

pub use ad::{Ad, AdContent, AdEvaluation};
pub use company::Company;
pub use user::User;

use chrono::{DateTime, SecondsFormat, Utc};

/// Current time as a fixed-width RFC 3339 UTC string.
///
/// Timestamps are stored as text, so every writer must use the same width
/// for lexical ordering to match chronological ordering.
#[must_use]
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_json_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

pub(crate) fn parse_json_object(raw: &str) -> serde_json::Map<String, serde_json::Value> {
    serde_json::from_str(raw).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamps_sort_lexically() {
        let a = format_timestamp(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
        let b = format_timestamp(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap() + chrono::Duration::microseconds(5),
        );
        assert_eq!(a, "2026-03-01T09:00:00.000000Z");
        assert!(a < b);
    }

    #[test]
    fn test_json_helpers_tolerate_garbage() {
        assert_eq!(parse_json_list(r#"["a","b"]"#), vec!["a", "b"]);
        assert!(parse_json_list("not json").is_empty());
        assert!(parse_json_object("[]").is_empty());
    }
}
