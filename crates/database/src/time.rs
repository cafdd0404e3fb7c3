//! Timestamp helpers.
//!
//! Every timestamp column holds UTC RFC 3339 text with millisecond precision
//! and a `Z` suffix, so string comparison in SQL matches chronological order.

use chrono::{DateTime, SecondsFormat, Utc};

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_are_fixed_width_and_ordered() {
        let early = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let late = early + chrono::Duration::milliseconds(1500);

        let a = format_timestamp(early);
        let b = format_timestamp(late);
        assert_eq!(a, "2025-01-02T03:04:05.000Z");
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }
}
