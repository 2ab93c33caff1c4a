//! HTTP client with automatic rate limiting and retry logic
//!
//! Every call to the destination goes through one limiter so concurrent record
//! migrations share the account's request budget.

use super::retry_policy::{retry_after, Replay, RetryPolicy};
use crate::shared::config::MigrationConfig;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::MigrationLog;
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use reqwest::{Client, Method, Response};
use serde_json::Value;
use std::num::NonZeroU32;
use std::time::{Duration, Instant};
use tokio::time::sleep;

type DirectLimiter = GovernorRateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
    governor::middleware::NoOpMiddleware,
>;

/// Status, `Location` and JSON body of a completed request.
///
/// Error statuses that are not retried are returned as data; the caller
/// decides whether a 4xx is a rejection or a protocol violation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub location: Option<String>,
    pub body: Value,
}

/// HTTP client that handles rate limiting and retries
pub struct RateLimitClient {
    client: Client,
    rate_limiter: DirectLimiter,
    retry_policy: RetryPolicy,
    user_agent: String,
    access_token: Option<String>,
}

impl RateLimitClient {
    /// Create a client from run configuration
    pub fn from_config(config: &MigrationConfig) -> Self {
        Self::new(
            RetryPolicy::destination(),
            Self::create_rate_limiter(config.requests_per_second, config.burst),
            config.user_agent.clone(),
            config.access_token.clone(),
        )
    }

    /// Create a rate limiter with specified requests per second and burst capacity
    fn create_rate_limiter(requests_per_second: f64, burst_size: u32) -> DirectLimiter {
        let burst = NonZeroU32::new(burst_size.max(1)).unwrap_or(NonZeroU32::MIN);
        let quota = if requests_per_second > 0.0 {
            Quota::with_period(Duration::from_secs_f64(1.0 / requests_per_second))
                .map(|q| q.allow_burst(burst))
                .unwrap_or_else(|| Quota::per_second(burst))
        } else {
            Quota::per_second(burst)
        };

        GovernorRateLimiter::direct(quota)
    }

    pub fn new(
        retry_policy: RetryPolicy,
        rate_limiter: DirectLimiter,
        user_agent: String,
        access_token: Option<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            rate_limiter,
            retry_policy,
            user_agent,
            access_token,
        }
    }

    /// Send a request with rate limiting, retrying the failures `replay` allows
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        respond_async: bool,
        replay: Replay,
    ) -> AppResult<RawResponse> {
        let max_retries = match replay {
            Replay::Never => 0,
            _ => self.retry_policy.max_retries,
        };
        let max_attempts = max_retries + 1;

        for attempt in 0..=max_retries {
            // Wait for rate limiter before attempting request
            self.rate_limiter.until_ready().await;

            let started = Instant::now();
            let sent = self
                .build_and_send_request(&method, url, body, respond_async)
                .await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match sent {
                Ok(response) => {
                    let status = response.status().as_u16();
                    MigrationLog::destination_call(method.as_str(), url, Some(status), elapsed_ms);

                    if replay.allows_status(status) && attempt < max_retries {
                        let delay = self
                            .retry_policy
                            .calculate_delay(attempt, retry_after(response.headers()));
                        log::warn!(
                            "Destination answered {} for {} {} (attempt {}/{}). Retrying in {:?}",
                            status,
                            method,
                            url,
                            attempt + 1,
                            max_attempts,
                            delay
                        );
                        sleep(delay).await;
                        continue;
                    }

                    if status == 429 {
                        return Err(AppError::RateLimited(format!(
                            "Destination rate limit exceeded after {} attempts",
                            max_attempts
                        )));
                    }
                    if (500..600).contains(&status) {
                        return Err(AppError::Unavailable(format!(
                            "Destination returned HTTP {} for {} {}",
                            status, method, url
                        )));
                    }
                    if status == 401 || status == 403 {
                        return Err(AppError::Unauthorized(format!(
                            "Destination refused {} {} with HTTP {}",
                            method, url, status
                        )));
                    }

                    return Self::read_response(response).await;
                }
                Err(e) => {
                    MigrationLog::destination_call(method.as_str(), url, None, elapsed_ms);
                    if replay.allows_error(&e) && attempt < max_retries {
                        let delay = self.retry_policy.calculate_delay(attempt, None);
                        log::warn!(
                            "Destination request {} {} failed (attempt {}/{}): {}. Retrying in {:?}",
                            method,
                            url,
                            attempt + 1,
                            max_attempts,
                            e,
                            delay
                        );
                        sleep(delay).await;
                        continue;
                    }
                    return Err(AppError::from(e));
                }
            }
        }

        // The final attempt always returns from inside the loop
        Err(AppError::Unavailable(format!(
            "Destination request {} {} failed after {} attempts",
            method, url, max_attempts
        )))
    }

    /// Build and send the actual HTTP request
    async fn build_and_send_request(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
        respond_async: bool,
    ) -> Result<Response, reqwest::Error> {
        let mut request_builder = self
            .client
            .request(method.clone(), url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/json");

        if let Some(token) = &self.access_token {
            request_builder = request_builder.bearer_auth(token);
        }
        if respond_async {
            request_builder = request_builder.header("Prefer", "respond-async");
        }
        if let Some(json_body) = body {
            request_builder = request_builder.json(json_body);
        }

        request_builder.send().await
    }

    async fn read_response(response: Response) -> AppResult<RawResponse> {
        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        let text = response.text().await.map_err(|e| {
            AppError::Decode(format!("Failed to read destination response: {}", e))
        })?;

        // Empty and non-JSON bodies are legitimate (204, HTML error pages)
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(RawResponse {
            status,
            location,
            body,
        })
    }

    /// Check if a request can be made now (for testing/debugging)
    pub fn can_make_request_now(&self) -> bool {
        self.rate_limiter.check().is_ok()
    }
}
