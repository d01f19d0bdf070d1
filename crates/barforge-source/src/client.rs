//! JSON-over-HTTP event source.

use std::time::Duration;

use async_trait::async_trait;
use barforge_types::{RawSample, RawTrade};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{EventSource, SourceError, SymbolFilter};

/// Configuration for the HTTP source.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the feed, e.g. `http://127.0.0.1:8080/api/`.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum retry attempts for failed requests.
    pub max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds).
    pub base_delay_ms: u64,
    /// Maximum delay between retries (in milliseconds).
    pub max_delay_ms: u64,
    /// User agent string.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
            user_agent: format!("barforge/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Event source reading JSON arrays from three endpoints:
/// `trades`, `index-samples` and `sector-samples`.
#[derive(Debug, Clone)]
pub struct HttpEventSource {
    client: Client,
    base_url: Url,
    config: ClientConfig,
}

impl HttpEventSource {
    /// Creates a new source with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be created.
    pub fn new(config: ClientConfig) -> Result<Self, SourceError> {
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| SourceError::Config(format!("base_url '{}': {e}", config.base_url)))?;

        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()?;
        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Builds the URL of `endpoint` with query parameters.
    fn url(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Url, SourceError> {
        let mut url = self
            .base_url
            .join(endpoint)
            .map_err(|e| SourceError::Config(format!("endpoint '{endpoint}': {e}")))?;
        url.query_pairs_mut()
            .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        Ok(url)
    }

    /// GETs a URL and decodes the JSON body, retrying transient failures.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, SourceError> {
        let mut attempts = 0;

        loop {
            match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        if attempts < self.config.max_retries {
                            attempts += 1;
                            let delay = self.calculate_backoff_delay(attempts);
                            warn!(%url, status = status.as_u16(), attempt = attempts, ?delay, "Retrying source request");
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        return Err(SourceError::Status {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                    }
                    if !status.is_success() {
                        return Err(SourceError::Status {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                    }

                    let body = response.bytes().await?;
                    return serde_json::from_slice(&body).map_err(|source| SourceError::Decode {
                        url: url.to_string(),
                        source,
                    });
                }
                Err(e) if self.is_retryable_error(&e) && attempts < self.config.max_retries => {
                    attempts += 1;
                    let delay = self.calculate_backoff_delay(attempts);
                    warn!(%url, error = %e, attempt = attempts, ?delay, "Retrying source request");
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_timeout() => return Err(SourceError::Timeout(attempts + 1)),
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Calculates the backoff delay with exponential backoff and jitter.
    fn calculate_backoff_delay(&self, attempt: u32) -> Duration {
        let exp_delay = self
            .config
            .base_delay_ms
            .saturating_mul(1u64 << attempt.min(10));
        let capped_delay = exp_delay.min(self.config.max_delay_ms);

        // ±25%, derived from the attempt number
        let jitter_range = capped_delay / 4;
        let jitter = if jitter_range > 0 {
            let offset = (u64::from(attempt) * 17) % (jitter_range * 2);
            offset as i64 - jitter_range as i64
        } else {
            0
        };

        let final_delay = (capped_delay as i64 + jitter).max(100) as u64;
        Duration::from_millis(final_delay)
    }

    /// Determines if an error is retryable.
    fn is_retryable_error(&self, error: &reqwest::Error) -> bool {
        if error.is_builder() {
            return false;
        }
        error.is_timeout() || error.is_connect() || error.is_request()
    }
}

fn since_param(since: DateTime<Utc>) -> (&'static str, String) {
    ("since", since.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[async_trait]
impl EventSource for HttpEventSource {
    async fn fetch_trades(
        &self,
        filter: &SymbolFilter,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<RawTrade>, SourceError> {
        let mut query = vec![since_param(since), ("limit", limit.to_string())];
        if let SymbolFilter::Only(symbols) = filter {
            let joined: Vec<&str> = symbols.iter().map(String::as_str).collect();
            query.push(("symbols", joined.join(",")));
        }
        let url = self.url("trades", &query)?;
        let trades: Vec<RawTrade> = self.get_json(url).await?;
        debug!(count = trades.len(), %since, "Fetched trades");
        Ok(trades)
    }

    async fn fetch_index_samples(&self, since: DateTime<Utc>) -> Result<Vec<RawSample>, SourceError> {
        let url = self.url("index-samples", &[since_param(since)])?;
        self.get_json(url).await
    }

    async fn fetch_sector_samples(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<RawSample>, SourceError> {
        let url = self.url("sector-samples", &[since_param(since)])?;
        self.get_json(url).await
    }
}
