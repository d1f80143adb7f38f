use crate::config::Config;
use crate::models::{
    error::AppError,
    network::{deserialize_ids, deserialize_optional_id},
    window::{Window, parse_timestamp},
};
use crate::services::api::ApiConfig;
use chrono::NaiveDateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Runtime settings, read once from `settings.json`.
///
/// A loaded value is always valid: the token is set, the polling interval is
/// at least one minute and `end` is after `start`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub authorization_token: String,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub network_id: Option<String>,
    /// Resolved to an id through `NetworkList` when `network_id` is absent
    #[serde(default)]
    pub network_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_ids")]
    pub sensor_list: Vec<String>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub start: NaiveDateTime,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub end: NaiveDateTime,
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// IANA zone exported message dates are rendered in
    #[serde(default = "default_timezone", deserialize_with = "deserialize_timezone")]
    pub timezone: Tz,
}

fn default_interval_minutes() -> u32 {
    Config::DEFAULT_INTERVAL_MINUTES
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(Config::OUTPUT_DIR)
}

fn default_timezone() -> Tz {
    Config::DEFAULT_TIMEZONE
}

fn deserialize_timezone<'de, D>(deserializer: D) -> Result<Tz, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse::<Tz>()
        .map_err(|e| serde::de::Error::custom(format!("unknown timezone '{s}': {e}")))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_timestamp(&s).map_err(serde::de::Error::custom)
}

impl Settings {
    /// Loads and validates settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            AppError::ConfigError(format!("Cannot open settings file {}: {e}", path.display()))
        })?;
        Self::from_reader(file)
    }

    /// Parses and validates settings from any JSON source.
    pub fn from_reader(reader: impl Read) -> Result<Self, AppError> {
        let settings: Self = serde_json::from_reader(reader)
            .map_err(|e| AppError::ConfigError(format!("Invalid settings: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.authorization_token.trim().is_empty() {
            return Err(AppError::ConfigError(
                "authorization_token must not be empty".to_string(),
            ));
        }
        if self.interval_minutes < 1 {
            return Err(AppError::ConfigError(
                "interval_minutes must be at least 1".to_string(),
            ));
        }
        self.window()?;
        Ok(())
    }

    /// The configured fetch window.
    pub fn window(&self) -> Result<Window, AppError> {
        Window::new(self.start, self.end)
    }

    /// Returns a copy with a different window, validated like a loaded file.
    pub fn with_window(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, AppError> {
        let settings = Self {
            start,
            end,
            ..self.clone()
        };
        settings.validate()?;
        Ok(settings)
    }

    /// API client configuration derived from these settings.
    pub fn api_config(&self) -> ApiConfig {
        let builder = ApiConfig::builder().token(self.authorization_token.clone());
        match &self.base_url {
            Some(url) => builder.base_url(url.clone()).build(),
            None => builder.build(),
        }
    }
}
