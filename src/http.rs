//! Shared HTTP client construction

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::time::Duration;

use crate::{PalatePilotError, Result};

pub const USER_AGENT: &str = concat!("PalatePilot/", env!("CARGO_PKG_VERSION"));

/// Plain client with a request timeout
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| PalatePilotError::config(format!("Failed to create HTTP client: {e}")))
}

/// Client that retries transient failures (5xx, 429, connection resets) with backoff.
/// Only use it for idempotent requests.
pub fn build_retrying_client(timeout: Duration, max_retries: u32) -> Result<ClientWithMiddleware> {
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);

    Ok(ClientBuilder::new(build_client(timeout)?)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}
