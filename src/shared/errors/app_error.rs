use serde::Serialize;
use thiserror::Error;

/// Failures talking to the destination or reading configuration.
///
/// Domain outcomes of a migration live in [`super::MigrationError`]; this type
/// is what the transport and config layers hand back.
#[derive(Error, Debug, Clone, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum AppError {
    /// Status the transport has no mapping for
    #[error("Unexpected destination response: {0}")]
    UnexpectedResponse(String),

    #[error("Not found in destination: {0}")]
    NotFound(String),

    #[error("Invalid destination URL: {0}")]
    InvalidUrl(String),

    #[error("Destination refused credentials: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Destination rate limit: {0}")]
    RateLimited(String),

    /// 5xx, timeouts and connection failures
    #[error("Destination unavailable: {0}")]
    Unavailable(String),

    #[error("Could not decode destination payload: {0}")]
    Decode(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Rate limits and unavailability clear up on their own; anything else
    /// will fail the same way again.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::RateLimited(_) | AppError::Unavailable(_) => true,
            AppError::UnexpectedResponse(msg) => msg.contains("HTTP 5"),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return AppError::Unavailable(format!("request timed out: {}", err));
        }
        if err.is_connect() {
            return AppError::Unavailable(format!("connection failed: {}", err));
        }
        if err.is_decode() {
            return AppError::Decode(err.to_string());
        }

        match err.status().map(|status| status.as_u16()) {
            Some(429) => AppError::RateLimited(err.to_string()),
            Some(404) => AppError::NotFound(err.to_string()),
            Some(401) | Some(403) => AppError::Unauthorized(err.to_string()),
            Some(status @ 500..=599) => AppError::Unavailable(format!("HTTP {}: {}", status, err)),
            Some(status) => AppError::UnexpectedResponse(format!("HTTP {}: {}", status, err)),
            None => AppError::UnexpectedResponse(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Decode(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
