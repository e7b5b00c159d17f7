//! HTTP fetching with bounded retry.
//!
//! Every transport error, timeout or non-2xx response costs one attempt.
//! When the attempts run out the caller gets a [`FetchFailure`] value
//! carrying the last error; nothing here panics or escapes as a fault.

mod retry;
mod user_agent;

pub use retry::{Delays, RetryPolicy};
pub use user_agent::{resolve_user_agent, USER_AGENT};

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

/// A fetch that failed on every attempt.
#[derive(Debug, Clone, Error)]
#[error("{url}: gave up after {attempts} attempt(s): {last_error}")]
pub struct FetchFailure {
    pub url: String,
    pub attempts: u32,
    pub last_error: String,
}

/// Anything that can turn a URL into a response body.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchFailure>;
}

#[derive(Debug, Error)]
enum AttemptError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    Status(StatusCode),
}

/// Retrying HTTP client for the publication server.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    retry: RetryPolicy,
}

/// Builder for constructing `HttpClient`.
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    retry: RetryPolicy,
}

impl HttpClientBuilder {
    /// Set the user agent string. Not called: default epoharvest agent.
    pub fn user_agent(mut self, ua: &str) -> Self {
        self.user_agent = Some(ua.to_string());
        self
    }

    /// Set the retry schedule.
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Build the `HttpClient`.
    pub fn build(self) -> Result<HttpClient, reqwest::Error> {
        let user_agent = resolve_user_agent(self.user_agent.as_deref());
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(self.timeout)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(HttpClient {
            client,
            retry: self.retry,
        })
    }
}

impl HttpClient {
    /// Create a builder. `timeout` bounds each individual attempt.
    pub fn builder(timeout: Duration) -> HttpClientBuilder {
        HttpClientBuilder {
            timeout,
            user_agent: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    async fn attempt(&self, url: &str) -> Result<Vec<u8>, AttemptError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status(status));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl Fetcher for HttpClient {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchFailure> {
        let attempts = self.retry.attempts();
        let mut delays = self.retry.delays();
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.attempt(url).await {
                Ok(body) => {
                    if attempt > 1 {
                        debug!("Fetched {} on attempt {}", url, attempt);
                    }
                    return Ok(body);
                }
                Err(e) => {
                    debug!("Attempt {}/{} for {} failed: {}", attempt, attempts, url, e);
                    last_error = e.to_string();
                }
            }

            if attempt < attempts {
                if let Some(wait) = delays.next() {
                    if !wait.is_zero() {
                        tokio::time::sleep(wait).await;
                    }
                }
            }
        }

        warn!("Giving up on {} after {} attempts: {}", url, attempts, last_error);
        Err(FetchFailure {
            url: url.to_string(),
            attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(attempts: u32) -> HttpClient {
        HttpClient::builder(Duration::from_secs(5))
            .retry(RetryPolicy::immediate(attempts))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/doc.xml")
            .with_status(200)
            .with_body("<root/>")
            .create_async()
            .await;

        let body = client(3)
            .fetch(&format!("{}/doc.xml", server.url()))
            .await
            .unwrap();
        assert_eq!(body, b"<root/>");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_gives_up_after_budget() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/flaky")
            .with_status(503)
            .expect(4)
            .create_async()
            .await;

        let url = format!("{}/flaky", server.url());
        let failure = client(4).fetch(&url).await.unwrap_err();
        assert_eq!(failure.attempts, 4);
        assert_eq!(failure.url, url);
        assert!(failure.last_error.contains("503"), "{}", failure.last_error);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_failure_value() {
        let failure = client(2)
            .fetch("http://127.0.0.1:9/unreachable")
            .await
            .unwrap_err();
        assert_eq!(failure.attempts, 2);
        assert!(!failure.last_error.is_empty());
    }
}
