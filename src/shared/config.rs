//! Environment-driven configuration for a migration run
//!
//! Values are read from the process environment after loading a `.env` file
//! if one exists. Only the destination base URL is required.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use uuid::Uuid;

use crate::shared::errors::{AppError, AppResult};

pub const ENV_BASE_URL: &str = "ERP_DEST_BASE_URL";
pub const ENV_ACCESS_TOKEN: &str = "ERP_DEST_ACCESS_TOKEN";
pub const ENV_REQUESTS_PER_SECOND: &str = "ERP_REQUESTS_PER_SECOND";
pub const ENV_BURST: &str = "ERP_BURST";
pub const ENV_LINE_BATCH_SIZE: &str = "ERP_LINE_BATCH_SIZE";
pub const ENV_LINE_BATCH_PAUSE_MS: &str = "ERP_LINE_BATCH_PAUSE_MS";
pub const ENV_MAX_CONCURRENT_RECORDS: &str = "ERP_MAX_CONCURRENT_RECORDS";
pub const ENV_USER_AGENT: &str = "ERP_USER_AGENT";

/// Configuration shared by the transport and the orchestrator
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Tags every log line of one run
    pub run_id: Uuid,
    /// Destination REST root, e.g. `https://acct.example.com/services/rest`
    pub base_url: String,
    /// Pre-acquired bearer token; acquiring it is the caller's job
    pub access_token: Option<String>,
    pub requests_per_second: f64,
    pub burst: u32,
    /// Lines per batch when expanding or reconciling large sublists
    pub line_batch_size: usize,
    pub line_batch_pause: Duration,
    pub max_concurrent_records: usize,
    pub user_agent: String,
}

impl MigrationConfig {
    pub const DEFAULT_REQUESTS_PER_SECOND: f64 = 4.0;
    pub const DEFAULT_BURST: u32 = 4;
    pub const DEFAULT_LINE_BATCH_SIZE: usize = 5;
    pub const DEFAULT_LINE_BATCH_PAUSE_MS: u64 = 250;
    pub const DEFAULT_MAX_CONCURRENT_RECORDS: usize = 4;

    /// Build a config with defaults for everything but the base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: None,
            requests_per_second: Self::DEFAULT_REQUESTS_PER_SECOND,
            burst: Self::DEFAULT_BURST,
            line_batch_size: Self::DEFAULT_LINE_BATCH_SIZE,
            line_batch_pause: Duration::from_millis(Self::DEFAULT_LINE_BATCH_PAUSE_MS),
            max_concurrent_records: Self::DEFAULT_MAX_CONCURRENT_RECORDS,
            user_agent: format!("erp-migrate/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Load from the process environment (and `.env`)
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load through an arbitrary key lookup; used by `from_env` and tests
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(ENV_BASE_URL)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config(format!("{} environment variable not found", ENV_BASE_URL))
            })?;

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "{} must be an http(s) URL, got '{}'",
                ENV_BASE_URL, base_url
            )));
        }

        let mut config = Self::new(base_url);
        config.access_token = lookup(ENV_ACCESS_TOKEN).filter(|v| !v.is_empty());

        if let Some(rps) = parse_var::<f64>(&lookup, ENV_REQUESTS_PER_SECOND)? {
            if rps <= 0.0 {
                return Err(AppError::InvalidValue(format!(
                    "{} must be positive",
                    ENV_REQUESTS_PER_SECOND
                )));
            }
            config.requests_per_second = rps;
        }
        if let Some(burst) = parse_var::<u32>(&lookup, ENV_BURST)? {
            config.burst = burst.max(1);
        }
        if let Some(size) = parse_var::<usize>(&lookup, ENV_LINE_BATCH_SIZE)? {
            config.line_batch_size = size.max(1);
        }
        if let Some(pause) = parse_var::<u64>(&lookup, ENV_LINE_BATCH_PAUSE_MS)? {
            config.line_batch_pause = Duration::from_millis(pause);
        }
        if let Some(limit) = parse_var::<usize>(&lookup, ENV_MAX_CONCURRENT_RECORDS)? {
            config.max_concurrent_records = limit.max(1);
        }
        if let Some(agent) = lookup(ENV_USER_AGENT).filter(|v| !v.is_empty()) {
            config.user_agent = agent;
        }

        Ok(config)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> AppResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse::<T>().map(Some).map_err(|e| {
            AppError::InvalidValue(format!("Invalid value '{}' for {}: {}", raw, key, e))
        }),
        _ => Ok(None),
    }
}
