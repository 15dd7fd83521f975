use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Maximum attempts per request. Rate-limit and transient failures back off
/// exponentially between attempts.
const MAX_ATTEMPTS: u32 = 3;

const BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Shared HTTP plumbing for all adapters: browser-like UA, per-request
/// timeout, a configurable inter-request delay, bounded backoff on 429/5xx,
/// and cooperative cancellation.
///
/// Adapters hold no other shared state; the `Fetcher` is cheap to clone.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    delay: Duration,
}

impl Fetcher {
    pub fn new(timeout: Duration, delay: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .expect("failed to build HTTP client");
        Self { client, delay }
    }

    /// A fetcher with no inter-request delay (enrichment fan-out already
    /// bounds its own concurrency).
    pub fn without_delay(timeout: Duration) -> Self {
        Self::new(timeout, Duration::ZERO)
    }

    /// GET a URL and return the response body as text.
    pub async fn get_text(&self, url: &str, cancel: &CancellationToken) -> Result<String> {
        let response = self.get_with_retry(url, &[], &[], cancel).await?;
        response.text().await.context("failed to read response body")
    }

    /// GET a URL with query parameters and decode a JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<T> {
        let response = self.get_with_retry(url, query, &[], cancel).await?;
        response.json().await.context("failed to decode JSON body")
    }

    /// GET with extra request headers (providers that gate on app ids).
    pub async fn get_json_with_headers<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        headers: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<T> {
        let response = self.get_with_retry(url, query, headers, cancel).await?;
        response.json().await.context("failed to decode JSON body")
    }

    /// GET a URL and return the raw bytes (image downloads).
    pub async fn get_bytes(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>> {
        let response = self.get_with_retry(url, &[], &[], cancel).await?;
        Ok(response.bytes().await.context("failed to read response bytes")?.to_vec())
    }

    async fn get_with_retry(
        &self,
        url: &str,
        query: &[(&str, &str)],
        headers: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response> {
        self.pause(self.delay, cancel).await?;

        let mut last_error = anyhow!("request not attempted");
        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                let backoff = BACKOFF_BASE * 2u32.pow(attempt - 1);
                debug!(url, attempt, backoff_ms = backoff.as_millis() as u64, "Retrying request");
                self.pause(backoff, cancel).await?;
            }

            let mut builder = self.client.get(url).query(query);
            for (name, value) in headers {
                builder = builder.header(*name, *value);
            }
            let request = builder.send();
            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(anyhow!("request cancelled: {url}")),
                result = request => result,
            };

            match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    if status.as_u16() == 429 || status.is_server_error() {
                        warn!(url, status = status.as_u16(), "Transient HTTP status, will retry");
                        last_error = anyhow!("HTTP {status} from {url}");
                        continue;
                    }
                    return Err(anyhow!("HTTP {status} from {url}"));
                }
                Err(e) => {
                    warn!(url, error = %e, "Request failed, will retry");
                    last_error = anyhow!(e).context(format!("request to {url} failed"));
                }
            }
        }

        Err(last_error)
    }

    async fn pause(&self, duration: Duration, cancel: &CancellationToken) -> Result<()> {
        if duration.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = cancel.cancelled() => Err(anyhow!("request cancelled during delay")),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn get_text_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .mount(&server)
            .await;

        let fetcher = Fetcher::without_delay(Duration::from_secs(5));
        let body = fetcher
            .get_text(&format!("{}/page", server.uri()), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(body, "hello");
    }

    #[tokio::test]
    async fn retries_on_server_error_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
            .mount(&server)
            .await;

        let fetcher = Fetcher::without_delay(Duration::from_secs(5));
        let body = fetcher
            .get_text(&format!("{}/flaky", server.uri()), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(body, "recovered");
    }

    #[tokio::test]
    async fn gives_up_after_bounded_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let fetcher = Fetcher::without_delay(Duration::from_secs(5));
        let result = fetcher
            .get_text(&format!("{}/down", server.uri()), &CancellationToken::new())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn client_error_does_not_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::without_delay(Duration::from_secs(5));
        let result = fetcher
            .get_text(&format!("{}/missing", server.uri()), &CancellationToken::new())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn cancelled_token_aborts_immediately() {
        let fetcher = Fetcher::new(Duration::from_secs(5), Duration::from_secs(60));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = fetcher.get_text("http://127.0.0.1:9/never", &cancel).await;
        assert!(result.is_err());
    }
}
