use chrono::NaiveDateTime;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid window: end {end} is not after start {start}")]
    InvalidWindow {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("Upstream error: {0}")]
    UpstreamError(#[from] UpstreamError),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures reported by, or while talking to, the Monnit API.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),
}
