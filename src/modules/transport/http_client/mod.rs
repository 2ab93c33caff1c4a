pub mod rate_limit_client;
pub mod retry_policy;

pub use rate_limit_client::{RateLimitClient, RawResponse};
pub use retry_policy::{Backoff, Replay, RetryPolicy};
