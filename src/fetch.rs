//! Page retrieval with bounded retries.
//!
//! # Architecture
//!
//! The module uses a trait-based design so the pipeline can run against real
//! HTTP or a stub:
//! - [`FetchPage`]: Core trait, one page body per call
//! - [`HttpFetcher`]: `reqwest` implementation with per-request timeout
//! - [`RetryFetch`]: Decorator that retries transient failures of any
//!   [`FetchPage`] with the configured [`BackoffStrategy`]
//!
//! # Retry Policy
//!
//! Timeouts, connection errors, 5xx, 408 and 429 are retried until
//! `max_attempts` calls have been made; the final result is then
//! [`FetchFailure::RetriesExhausted`]. Any other failure is returned after the
//! attempt that produced it.

use crate::config::{BackoffStrategy, PipelineConfig};
use crate::error::FetchFailure;
use crate::models::SourceUrl;
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::fmt;
use std::time::Instant;
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// Anything that can turn a URL into a page body.
pub trait FetchPage {
    /// Retrieve the body of `url` as text.
    async fn fetch(&self, url: &SourceUrl) -> Result<String, FetchFailure>;
}

impl<T: FetchPage> FetchPage for &T {
    async fn fetch(&self, url: &SourceUrl) -> Result<String, FetchFailure> {
        (**self).fetch(url).await
    }
}

/// HTTP fetcher backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a client with the configured timeout and request headers.
    /// Redirects are followed.
    pub fn new(config: &PipelineConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        if let Ok(lang) = HeaderValue::from_str(&config.accept_language) {
            headers.insert(ACCEPT_LANGUAGE, lang);
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()?;
        Ok(Self { client })
    }
}

impl FetchPage for HttpFetcher {
    #[instrument(level = "debug", skip_all, fields(url = %url))]
    async fn fetch(&self, url: &SourceUrl) -> Result<String, FetchFailure> {
        let t0 = Instant::now();
        let resp = self.client.get(url.as_str()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "Non-success status");
            return Err(FetchFailure::HttpError(status.as_u16()));
        }
        let body = resp.text().await?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body)
    }
}

/// Wrapper that adds retry with backoff to any [`FetchPage`] implementation.
pub struct RetryFetch<T> {
    /// The underlying fetcher to wrap.
    inner: T,
    /// Total attempts per URL, at least 1.
    max_attempts: u32,
    backoff: BackoffStrategy,
}

impl<T: FetchPage> RetryFetch<T> {
    /// Wrap `inner`. `max_attempts` of 0 is treated as 1.
    pub fn new(inner: T, max_attempts: u32, backoff: BackoffStrategy) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish()
    }
}

impl<T: FetchPage> FetchPage for RetryFetch<T> {
    #[instrument(level = "info", skip_all, fields(url = %url))]
    async fn fetch(&self, url: &SourceUrl) -> Result<String, FetchFailure> {
        let total_t0 = Instant::now();
        let mut attempt = 0u32;

        loop {
            let attempt_t0 = Instant::now();
            let err = match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) => e,
            };
            attempt += 1;

            if !err.is_transient() {
                warn!(attempt, error = %err, "fetch failed; not retryable");
                return Err(err);
            }

            if attempt >= self.max_attempts {
                error!(
                    attempt,
                    max = self.max_attempts,
                    elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                    error = %err,
                    "fetch exhausted retries"
                );
                return Err(FetchFailure::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            let delay = self.backoff.delay(attempt);
            warn!(
                attempt,
                max = self.max_attempts,
                elapsed_ms_attempt = attempt_t0.elapsed().as_millis() as u64,
                elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                ?delay,
                error = %err,
                "fetch attempt failed; backing off"
            );
            sleep(delay).await;
        }
    }
}
