//! Retry policy for requests to the destination instance
//!
//! Covers individual HTTP requests only: 429s, 5xx and dropped connections.
//! Job polling has its own fixed-delay budget in `PollPolicyTable`.

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;

/// Growth of the delay between attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed,
    Exponential { multiplier: f64 },
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Ceiling for computed delays and for server-sent `Retry-After`
    pub max_delay: Duration,
    pub backoff: Backoff,
    /// Up to 10% extra so concurrent records don't retry in lockstep
    pub jitter: bool,
}

impl RetryPolicy {
    /// The destination throttles per account on concurrency, so back off hard
    pub fn destination() -> Self {
        Self {
            max_retries: 4,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff: Backoff::Exponential { multiplier: 2.0 },
            jitter: true,
        }
    }

    /// Single attempt; for callers that retry on their own
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff: Backoff::Fixed,
            jitter: false,
        }
    }

    /// Delay before retry number `attempt` (zero-based). A server-provided
    /// `retry_after` replaces the computed delay.
    pub fn calculate_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(server_delay) = retry_after {
            return server_delay.min(self.max_delay);
        }

        let delay = match self.backoff {
            Backoff::Fixed => self.base_delay,
            Backoff::Exponential { multiplier } => {
                self.base_delay.mul_f64(multiplier.powi(attempt.min(32) as i32))
            }
        }
        .min(self.max_delay);

        if self.jitter && !delay.is_zero() {
            delay + delay.mul_f64(0.1 * rand::random::<f64>())
        } else {
            delay
        }
    }
}

/// `Retry-After` as either delta-seconds or an HTTP date
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(seconds) = raw.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let at = DateTime::parse_from_rfc2822(raw).ok()?.with_timezone(&Utc);
    Some((at - Utc::now()).to_std().unwrap_or(Duration::ZERO))
}

/// Which failures a request may be sent again after
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replay {
    /// Reads: any transient status or dropped connection
    Idempotent,
    /// Creates: only a 429, which the destination answers before processing
    RefusedOnly,
    /// Sent exactly once; the caller owns the retry budget
    Never,
}

impl Replay {
    pub fn allows_status(self, status: u16) -> bool {
        match self {
            Replay::Idempotent => is_retryable_status(status),
            Replay::RefusedOnly => status == 429,
            Replay::Never => false,
        }
    }

    pub fn allows_error(self, error: &reqwest::Error) -> bool {
        match self {
            Replay::Idempotent => is_retryable_error(error),
            Replay::RefusedOnly | Replay::Never => false,
        }
    }
}

/// Whether an HTTP status warrants another attempt
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 425 | 429 | 500..=599)
}

/// Whether a reqwest failure warrants another attempt
pub fn is_retryable_error(error: &reqwest::Error) -> bool {
    match error.status() {
        Some(status) => is_retryable_status(status.as_u16()),
        None => error.is_timeout() || error.is_connect(),
    }
}
