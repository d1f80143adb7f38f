use super::error::AppError;
use crate::config::Config;
use chrono::{Duration, NaiveDateTime};

/// A calendar interval `[start, end]` with `start < end`.
///
/// Timestamps are naive wall-clock values: the Monnit API interprets
/// `fromDate`/`toDate` in the account's time zone, so no conversion happens
/// on this side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl Window {
    /// Creates a window, rejecting empty and inverted intervals.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, AppError> {
        if end <= start {
            return Err(AppError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Whether the window is longer than `max_span`.
    pub fn exceeds(&self, max_span: Duration) -> bool {
        self.duration() > max_span
    }

    /// Partitions the window into consecutive sub-windows of at most
    /// `max_span`. The last one is clipped to `end`.
    ///
    /// A window that does not exceed `max_span` is returned unchanged. A
    /// non-positive span is rejected.
    pub fn split(&self, max_span: Duration) -> Result<Vec<Self>, AppError> {
        if max_span <= Duration::zero() {
            return Err(AppError::ConfigError(format!(
                "Maximum window span must be positive, got {max_span}"
            )));
        }
        if !self.exceeds(max_span) {
            return Ok(vec![*self]);
        }

        let mut windows = Vec::new();
        let mut current = self.start;
        while current < self.end {
            let next = current
                .checked_add_signed(max_span)
                .map_or(self.end, |t| t.min(self.end));
            windows.push(Self {
                start: current,
                end: next,
            });
            current = next;
        }
        Ok(windows)
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -> {}",
            self.start.format(Config::TIMESTAMP_FORMAT),
            self.end.format(Config::TIMESTAMP_FORMAT)
        )
    }
}

/// True when `end - start` is longer than the seven day API limit.
pub fn is_window_too_large(start: NaiveDateTime, end: NaiveDateTime) -> bool {
    end - start > Config::max_window_span()
}

/// Splits `[start, end]` into sub-windows no longer than `max_span`.
pub fn split_window(
    start: NaiveDateTime,
    end: NaiveDateTime,
    max_span: Duration,
) -> Result<Vec<Window>, AppError> {
    Window::new(start, end)?.split(max_span)
}

/// Parses a `YYYY-MM-DD HH:MM:SS` timestamp.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, AppError> {
    NaiveDateTime::parse_from_str(s.trim(), Config::TIMESTAMP_FORMAT)
        .map_err(|e| AppError::ConfigError(format!("Invalid timestamp '{s}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn test_parse_timestamp_single_digit_hour() {
        assert_eq!(ts("2023-12-25 5:00:00"), ts("2023-12-25 05:00:00"));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(matches!(
            parse_timestamp("25/12/2023"),
            Err(AppError::ConfigError(_))
        ));
    }

    #[test]
    fn test_window_too_large_boundary() {
        let start = ts("2023-12-01 00:00:00");
        assert!(!is_window_too_large(start, ts("2023-12-08 00:00:00")));
        assert!(is_window_too_large(start, ts("2023-12-08 00:00:01")));
        assert!(!is_window_too_large(start, ts("2023-12-02 00:00:00")));
    }

    #[test]
    fn test_window_rejects_empty_and_inverted() {
        let t = ts("2023-12-12 16:30:00");
        assert!(matches!(
            Window::new(t, t),
            Err(AppError::InvalidWindow { .. })
        ));
        assert!(matches!(
            split_window(t, ts("2023-12-01 00:00:00"), Config::max_window_span()),
            Err(AppError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn test_small_window_is_not_split() {
        let start = ts("2023-12-12 16:30:00");
        let end = ts("2023-12-15 05:00:00");
        let windows = split_window(start, end, Config::max_window_span()).unwrap();

        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start(), start);
        assert_eq!(windows[0].end(), end);
    }

    #[test]
    fn test_split_december_range() {
        let start = ts("2023-12-01 16:30:00");
        let end = ts("2023-12-25 05:00:00");
        let windows = split_window(start, end, Config::max_window_span()).unwrap();

        let bounds: Vec<(NaiveDateTime, NaiveDateTime)> =
            windows.iter().map(|w| (w.start(), w.end())).collect();
        assert_eq!(
            bounds,
            vec![
                (ts("2023-12-01 16:30:00"), ts("2023-12-08 16:30:00")),
                (ts("2023-12-08 16:30:00"), ts("2023-12-15 16:30:00")),
                (ts("2023-12-15 16:30:00"), ts("2023-12-22 16:30:00")),
                (ts("2023-12-22 16:30:00"), ts("2023-12-25 05:00:00")),
            ]
        );
        assert_eq!(
            windows[3].duration(),
            Duration::days(2) + Duration::hours(12) + Duration::minutes(30)
        );
    }

    #[test]
    fn test_split_partitions_exactly() {
        let max_span = Config::max_window_span();
        let start = ts("2024-02-20 08:15:42");
        let lengths = [
            Duration::days(7) + Duration::seconds(1),
            Duration::days(14),
            Duration::days(14) + Duration::minutes(1),
            Duration::days(60) + Duration::hours(5),
            Duration::days(365),
        ];

        for length in lengths {
            let end = start + length;
            let windows = split_window(start, end, max_span).unwrap();

            assert!(windows.len() > 1);
            assert_eq!(windows.first().unwrap().start(), start);
            assert_eq!(windows.last().unwrap().end(), end);
            for w in &windows {
                assert!(w.duration() <= max_span);
                assert!(w.duration() > Duration::zero());
            }
            for pair in windows.windows(2) {
                assert_eq!(pair[0].end(), pair[1].start());
            }
            let total = windows
                .iter()
                .fold(Duration::zero(), |acc, w| acc + w.duration());
            assert_eq!(total, length);
        }
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_window() {
        let start = ts("2024-01-01 00:00:00");
        let windows = split_window(start, start + Duration::days(21), Config::max_window_span())
            .unwrap();
        assert_eq!(windows.len(), 3);
    }

    #[test]
    fn test_split_rejects_non_positive_span() {
        let start = ts("2024-01-01 00:00:00");
        let end = start + Duration::days(30);

        for span in [Duration::zero(), Duration::days(-7)] {
            assert!(matches!(
                split_window(start, end, span),
                Err(AppError::ConfigError(_))
            ));
        }
    }

    #[test]
    fn test_window_display() {
        let w = Window::new(ts("2023-12-12 16:30:00"), ts("2023-12-15 05:00:00")).unwrap();
        assert_eq!(w.to_string(), "2023-12-12 16:30:00 -> 2023-12-15 05:00:00");
    }
}
