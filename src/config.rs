use chrono::Duration;
use chrono_tz::Tz;

/// Configuration constants for the application
pub struct Config;

impl Config {
    /// Largest span a single `SensorDataMessages` request may cover
    pub const MAX_WINDOW_DAYS: i64 = 7;

    /// Pause between two consecutive upstream calls when settings omit it
    pub const DEFAULT_INTERVAL_MINUTES: u32 = 10;

    /// Settings file read when no path is given on the command line
    pub const SETTINGS_FILE: &str = "settings.json";

    /// Directory exported readings are written to
    pub const OUTPUT_DIR: &str = "output";

    /// Wall-clock format used in settings, CLI flags and API queries
    pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    /// Zone exported timestamps are rendered in when settings omit it
    pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Brussels;

    /// Maximum window span as a duration.
    pub fn max_window_span() -> Duration {
        Duration::days(Self::MAX_WINDOW_DAYS)
    }
}
