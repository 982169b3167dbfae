//! Domain primitives: TimeMs and its accepted textual forms.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

impl TimeMs {
    /// Create a TimeMs from milliseconds.
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Get the underlying milliseconds value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Parse a timestamp string.
    ///
    /// Accepts RFC 3339, `YYYY-MM-DD HH:MM[:SS]` and `DD/MM/YYYY HH:MM[:SS]`.
    /// Offset-less forms are read as UTC. A bare integer is taken as epoch ms.
    pub fn parse(input: &str) -> Option<Self> {
        let s = input.trim();
        if s.is_empty() {
            return None;
        }
        if let Ok(ms) = s.parse::<i64>() {
            return Some(TimeMs(ms));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(TimeMs(dt.timestamp_millis()));
        }
        NAIVE_FORMATS.iter().find_map(|fmt| {
            NaiveDateTime::parse_from_str(s, fmt)
                .ok()
                .map(|naive| TimeMs(Utc.from_utc_datetime(&naive).timestamp_millis()))
        })
    }

    /// Milliseconds elapsed from `earlier` to `self`, clamped at zero.
    pub fn millis_since(&self, earlier: TimeMs) -> i64 {
        self.0.saturating_sub(earlier.0).max(0)
    }

    /// RFC 3339 rendering in UTC, if the value is representable.
    pub fn to_rfc3339(&self) -> Option<String> {
        DateTime::<Utc>::from_timestamp_millis(self.0).map(|dt| dt.to_rfc3339())
    }
}

impl std::fmt::Display for TimeMs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_rfc3339() {
            Some(s) => write!(f, "{}", s),
            None => write!(f, "{}ms", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timems_ordering() {
        let t1 = TimeMs::new(1000);
        let t2 = TimeMs::new(2000);
        assert!(t1 < t2);
    }

    #[test]
    fn test_parse_rfc3339() {
        let t = TimeMs::parse("2024-01-02T03:04:05Z").unwrap();
        assert_eq!(t, TimeMs::new(1_704_164_645_000));
    }

    #[test]
    fn test_parse_naive_forms_as_utc() {
        let iso = TimeMs::parse("2024-01-02 03:04:05").unwrap();
        let short = TimeMs::parse("2024-01-02 03:04").unwrap();
        let br = TimeMs::parse("02/01/2024 03:04:05").unwrap();
        assert_eq!(iso, TimeMs::new(1_704_164_645_000));
        assert_eq!(short, TimeMs::new(1_704_164_640_000));
        assert_eq!(br, iso);
    }

    #[test]
    fn test_parse_epoch_millis_and_garbage() {
        assert_eq!(TimeMs::parse(" 1700000000000 "), Some(TimeMs::new(1_700_000_000_000)));
        assert_eq!(TimeMs::parse("yesterday"), None);
        assert_eq!(TimeMs::parse(""), None);
    }

    #[test]
    fn test_millis_since_clamps() {
        assert_eq!(TimeMs::new(5000).millis_since(TimeMs::new(2000)), 3000);
        assert_eq!(TimeMs::new(2000).millis_since(TimeMs::new(5000)), 0);
    }

    #[test]
    fn test_display_is_rfc3339() {
        assert_eq!(TimeMs::new(0).to_string(), "1970-01-01T00:00:00+00:00");
    }
}
