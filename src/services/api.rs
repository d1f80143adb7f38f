use crate::config::Config;
use crate::models::{
    error::{AppError, UpstreamError},
    network::{Network, Sensor, deserialize_id},
    reading::Reading,
    window::Window,
};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use reqwest::Url;
use serde::{Deserialize, de::DeserializeOwned};

// CONSTANTS
const BASE_URL: &str = "https://www.imonnit.com/json";

// SENSOR API
/// Operations the fetcher needs from the vendor API.
#[allow(async_fn_in_trait)]
pub trait SensorApi {
    /// Lists every network visible to the account.
    async fn list_networks(&self) -> Result<Vec<Network>, AppError>;

    /// Lists the sensors of one network.
    async fn list_sensors(&self, network_id: &str) -> Result<Vec<Sensor>, AppError>;

    /// Fetches the data messages of a sensor within `window`.
    async fn get_readings(&self, sensor_id: &str, window: &Window)
    -> Result<Vec<Reading>, AppError>;
}

impl<A: SensorApi> SensorApi for &A {
    async fn list_networks(&self) -> Result<Vec<Network>, AppError> {
        (**self).list_networks().await
    }

    async fn list_sensors(&self, network_id: &str) -> Result<Vec<Sensor>, AppError> {
        (**self).list_sensors(network_id).await
    }

    async fn get_readings(
        &self,
        sensor_id: &str,
        window: &Window,
    ) -> Result<Vec<Reading>, AppError> {
        (**self).get_readings(sensor_id, window).await
    }
}

// API CONFIGURATION
/// Configuration for the Monnit API client.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    base_url: String,
    token: String,
}

impl ApiConfig {
    /// Creates a builder for constructing an `ApiConfig`.
    pub fn builder() -> ApiConfigBuilder {
        ApiConfigBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the `NetworkList` endpoint.
    pub fn network_list_url(&self) -> Result<Url, AppError> {
        self.endpoint_url("NetworkList", &[])
    }

    /// URL of the `SensorList` endpoint for one network.
    pub fn sensor_list_url(&self, network_id: &str) -> Result<Url, AppError> {
        self.endpoint_url("SensorList", &[("NetworkID", network_id.to_string())])
    }

    /// URL of the `SensorDataMessages` endpoint for a sensor and window.
    pub fn sensor_data_url(&self, sensor_id: &str, window: &Window) -> Result<Url, AppError> {
        self.endpoint_url(
            "SensorDataMessages",
            &[
                ("sensorID", sensor_id.to_string()),
                (
                    "fromDate",
                    window.start().format(Config::TIMESTAMP_FORMAT).to_string(),
                ),
                (
                    "toDate",
                    window.end().format(Config::TIMESTAMP_FORMAT).to_string(),
                ),
            ],
        )
    }

    /// `{base}/{method}/{token}?{params}`; the token is always the last
    /// path segment.
    fn endpoint_url(&self, method: &str, params: &[(&str, String)]) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| AppError::ConfigError(format!("Invalid API URL for {method}: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| {
                AppError::ConfigError(format!("Invalid API base URL: {}", self.base_url))
            })?
            .pop_if_empty()
            .push(method)
            .push(&self.token);
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    /// Renders a request URL for logs with the token segment masked.
    fn redact(&self, url: &Url) -> String {
        let mut redacted = url.clone();
        if let Ok(mut segments) = redacted.path_segments_mut() {
            segments.pop().push("***");
        }
        redacted.to_string()
    }
}

// API CONFIGURATION BUILDER
/// Builder for constructing an `ApiConfig` with custom settings.
#[derive(Debug, Default)]
pub struct ApiConfigBuilder {
    base_url: Option<String>,
    token: Option<String>,
}

impl ApiConfigBuilder {
    /// Sets a custom base URL (primarily for testing).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the authorization token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Builds the `ApiConfig`.
    pub fn build(self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.unwrap_or_else(|| BASE_URL.to_string()),
            token: self.token.unwrap_or_default(),
        }
    }
}

// API RESPONSE TYPES
#[derive(Deserialize, Debug)]
struct ApiResponse<T> {
    #[serde(rename = "Result", default = "ApiResult::empty")]
    result: ApiResult<T>,
}

/// `Result` holds the payload on success and a plain message on failure.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum ApiResult<T> {
    Items(Vec<T>),
    Message(String),
}

impl<T> ApiResult<T> {
    const fn empty() -> Self {
        Self::Items(Vec::new())
    }
}

impl<T> ApiResponse<T> {
    fn into_items(self) -> Result<Vec<T>, UpstreamError> {
        match self.result {
            ApiResult::Items(items) => Ok(items),
            ApiResult::Message(message) if message.to_lowercase().contains("authoriz") => {
                Err(UpstreamError::AuthError(message))
            }
            ApiResult::Message(message) => Err(UpstreamError::ApiError(message)),
        }
    }
}

#[derive(Deserialize, Debug)]
struct ApiNetwork {
    #[serde(rename = "NetworkID", deserialize_with = "deserialize_id")]
    network_id: String,
    #[serde(rename = "NetworkName", default)]
    network_name: String,
}

impl From<ApiNetwork> for Network {
    fn from(n: ApiNetwork) -> Self {
        Self {
            id: n.network_id,
            name: n.network_name,
        }
    }
}

#[derive(Deserialize, Debug)]
struct ApiSensor {
    #[serde(rename = "SensorID", deserialize_with = "deserialize_id")]
    sensor_id: String,
    #[serde(rename = "SensorName", default)]
    sensor_name: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct ApiReading {
    #[serde(rename = "SensorID", deserialize_with = "deserialize_id")]
    sensor_id: String,
    message_date: String,
    plot_value: Option<String>,
    plot_values: Option<String>,
    plot_labels: Option<String>,
    display_data: Option<String>,
    battery: Option<u8>,
    signal_strength: Option<i32>,
    voltage: Option<f64>,
}

impl TryFrom<ApiReading> for Reading {
    type Error = AppError;

    fn try_from(r: ApiReading) -> Result<Self, Self::Error> {
        let timestamp = parse_message_date(&r.message_date)?;

        let mut values: Vec<f64> = r
            .plot_values
            .as_deref()
            .map(parse_values)
            .unwrap_or_default();
        if values.is_empty() {
            values = r.plot_value.as_deref().map(parse_values).unwrap_or_default();
        }

        let labels = r
            .plot_labels
            .as_deref()
            .map(|s| {
                s.split('|')
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            sensor_id: r.sensor_id,
            timestamp,
            values,
            labels,
            display: r.display_data.unwrap_or_default(),
            battery: r.battery,
            signal_strength: r.signal_strength,
            voltage: r.voltage,
        })
    }
}

/// Converts data messages, skipping the ones that cannot be read.
fn readings_from(messages: Vec<ApiReading>) -> Vec<Reading> {
    messages
        .into_iter()
        .filter_map(|message| match Reading::try_from(message) {
            Ok(reading) => Some(reading),
            Err(e) => {
                warn!("Skipping data message: {e}");
                None
            }
        })
        .collect()
}

fn parse_values(s: &str) -> Vec<f64> {
    s.split('|')
        .filter_map(|v| v.trim().parse::<f64>().ok())
        .collect()
}

/// Parses a `/Date(1702047600000)/` value, with or without a `+hhmm` suffix.
pub fn parse_message_date(raw: &str) -> Result<DateTime<Utc>, AppError> {
    let invalid = || AppError::DataError(format!("Invalid MessageDate: {raw}"));

    let inner = raw
        .trim()
        .strip_prefix("/Date(")
        .and_then(|s| s.strip_suffix(")/"))
        .ok_or_else(invalid)?;

    // The suffix only describes the sender's offset; the millis are UTC.
    let millis_end = inner
        .char_indices()
        .skip(1)
        .find(|(_, c)| *c == '+' || *c == '-')
        .map_or(inner.len(), |(i, _)| i);

    let millis: i64 = inner[..millis_end].parse().map_err(|_| invalid())?;
    DateTime::from_timestamp_millis(millis).ok_or_else(invalid)
}

// MONNIT CLIENT
/// HTTP client for the Monnit iMonnit JSON API.
pub struct MonnitClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl MonnitClient {
    /// Creates a new client with the specified configuration.
    pub fn with_config(config: ApiConfig) -> Result<Self, AppError> {
        if config.token.trim().is_empty() {
            return Err(AppError::ConfigError(
                "Missing authorization token".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Returns a reference to the client's configuration.
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Executes a single request and unwraps the `Result` payload.
    async fn fetch<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, AppError> {
        debug!("GET {}", self.config.redact(&url));

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &body).into());
        }

        let api_response: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| UpstreamError::ApiError(format!("Failed to parse response: {e}")))?;

        Ok(api_response.into_items()?)
    }

    /// Converts a reqwest error into an appropriate `UpstreamError`.
    ///
    /// The URL is dropped from the message since it carries the token.
    fn classify_error(&self, error: reqwest::Error) -> UpstreamError {
        let error = error.without_url();
        if error.is_timeout() {
            UpstreamError::ApiError(format!("Request timeout: {error}"))
        } else if error.is_request() {
            UpstreamError::ApiError(format!("Request error: {error}"))
        } else {
            UpstreamError::ApiError(format!("Network error: {error}"))
        }
    }
}

/// Creates an error based on HTTP status code.
fn error_for_status(status: reqwest::StatusCode, body: &str) -> UpstreamError {
    match status.as_u16() {
        429 => UpstreamError::RateLimited,
        401 | 403 => UpstreamError::AuthError(format!("Authentication failed: {status}")),
        404 => UpstreamError::NotFound(format!("Resource not found: {body}")),
        400..=499 => UpstreamError::ApiError(format!("Client error {status}: {body}")),
        500..=599 => UpstreamError::ApiError(format!("Server error {status}: {body}")),
        _ => UpstreamError::ApiError(format!("Unexpected status {status}: {body}")),
    }
}

impl SensorApi for MonnitClient {
    async fn list_networks(&self) -> Result<Vec<Network>, AppError> {
        let url = self.config.network_list_url()?;
        let networks: Vec<ApiNetwork> = self.fetch(url).await?;
        Ok(networks.into_iter().map(Into::into).collect())
    }

    async fn list_sensors(&self, network_id: &str) -> Result<Vec<Sensor>, AppError> {
        let url = self.config.sensor_list_url(network_id)?;
        let sensors: Vec<ApiSensor> = self.fetch(url).await?;
        Ok(sensors
            .into_iter()
            .map(|s| Sensor {
                id: s.sensor_id,
                name: s.sensor_name,
                network_id: network_id.to_string(),
            })
            .collect())
    }

    async fn get_readings(
        &self,
        sensor_id: &str,
        window: &Window,
    ) -> Result<Vec<Reading>, AppError> {
        let url = self.config.sensor_data_url(sensor_id, window)?;
        let messages: Vec<ApiReading> = self.fetch(url).await?;
        Ok(readings_from(messages))
    }
}
