//! Single-request execution with retry and exponential backoff.

use std::sync::Arc;

use common::{RemoteApi, Request, Response};
use tracing::debug;

use crate::config::RetryConfig;
use crate::error::{Error, Result};

/// Executes one logical request against the remote service, retrying
/// transient failures with exponential backoff.
///
/// This is the only layer that retries. Backoff state lives for the span of
/// one `execute` call: the delay starts at the configured base, doubles each
/// retry, and is capped at the configured maximum. Permanent failures
/// propagate immediately, and a transient failure that survives every
/// attempt is surfaced as [`Error::RetriesExhausted`] carrying the last
/// error — never swallowed.
#[derive(Clone)]
pub struct PageFetcher {
    api: Arc<dyn RemoteApi>,
    retry: RetryConfig,
}

impl PageFetcher {
    /// Creates a fetcher issuing requests through `api`.
    pub fn new(api: Arc<dyn RemoteApi>, retry: RetryConfig) -> Self {
        Self { api, retry }
    }

    /// Issues `request`, blocking the calling task until a response or a
    /// final failure is obtained.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let mut delay = self.retry.base_delay;
        let mut attempt: u32 = 1;
        loop {
            match self.api.issue(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(err) if !err.is_transient() => return Err(Error::Service(err)),
                Err(err) if attempt >= self.retry.max_attempts => {
                    return Err(Error::RetriesExhausted {
                        attempts: attempt,
                        last: err,
                    });
                }
                Err(err) => {
                    debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "service unavailable, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2).min(self.retry.max_delay);
                    attempt += 1;
                }
            }
        }
    }
}
