//! InfluxDB 1.x HTTP client
//!
//! Implements [`SeriesStore`] on top of the `/query` endpoint with:
//! - Basic auth and a per-request timeout
//! - Retry logic with exponential backoff for network errors, 429 and 5xx
//! - Statement-level error extraction from response bodies

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, StatusCode};
use tracing::{debug, warn};

use super::config::StoreConfig;
use super::parser::{self, ResultSeries};
use super::query;
use super::{CopyDestination, SeriesStore, StoreError, StoreResult};
use crate::migrator::config::calculate_backoff;
use crate::{Record, TimeWindow};

/// HTTP client bound to one source database
pub struct InfluxHttpClient {
    client: Client,
    base_url: String,
    database: String,
    username: Option<String>,
    password: Option<String>,
    max_retries: u32,
}

impl InfluxHttpClient {
    /// Create a client for `database` on the server described by `config`
    pub fn new(config: StoreConfig, database: impl Into<String>) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            database: database.into(),
            username: config.username,
            password: config.password,
            max_retries: config.retries,
        })
    }

    /// Base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run one statement and return its result series.
    ///
    /// Reads use GET; `SELECT ... INTO` must be sent with POST.
    async fn query(
        &self,
        statement: &str,
        method: Method,
        epoch: Option<&str>,
    ) -> StoreResult<Vec<ResultSeries>> {
        let url = format!("{}/query", self.base_url);
        let mut params: Vec<(&str, &str)> = vec![("db", self.database.as_str()), ("q", statement)];
        if let Some(epoch) = epoch {
            params.push(("epoch", epoch));
        }

        debug!(query = %statement, "Executing query");

        let body = self.request_with_retry(&url, method, &params).await.map_err(|e| {
            warn!(query = %statement, error = %e, "Query failed");
            e
        })?;

        parser::parse_series(&body, statement).map_err(|e| {
            warn!(query = %statement, error = %e, "Query returned an error");
            e
        })
    }

    /// Send the request, retrying network errors, 429 and 5xx.
    ///
    /// 4xx responses other than 429 carry a statement error in their body and
    /// are returned for parsing without a retry.
    async fn request_with_retry(
        &self,
        url: &str,
        method: Method,
        params: &[(&str, &str)],
    ) -> StoreResult<String> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            let mut request = self.client.request(method.clone(), url).query(params);
            if let Some(username) = &self.username {
                request = request.basic_auth(username, self.password.as_ref());
            }

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(
                        "Network error on attempt {}/{}: {}",
                        attempt + 1,
                        self.max_retries + 1,
                        e
                    );
                    last_error = Some(StoreError::NetworkError(e.to_string()));
                    if attempt < self.max_retries {
                        self.backoff(attempt).await;
                        continue;
                    }
                    break;
                }
            };

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                warn!(
                    "Rate limit error (429) on attempt {}/{}",
                    attempt + 1,
                    self.max_retries + 1
                );
                last_error = Some(StoreError::RateLimitExceeded);
                if attempt < self.max_retries {
                    self.backoff(attempt).await;
                    continue;
                }
                break;
            }

            if status.is_server_error() {
                warn!(
                    "Server error {} on attempt {}/{}",
                    status,
                    attempt + 1,
                    self.max_retries + 1
                );
                last_error = Some(StoreError::HttpError(format!("Server error: {status}")));
                if attempt < self.max_retries {
                    self.backoff(attempt).await;
                    continue;
                }
                break;
            }

            let text = response
                .text()
                .await
                .map_err(|e| StoreError::NetworkError(format!("Failed to read response: {e}")))?;

            if status.is_client_error() && !text.trim_start().starts_with('{') {
                return Err(StoreError::HttpError(format!("Client error {status}: {text}")));
            }

            debug!("Request succeeded on attempt {}", attempt + 1);
            return Ok(text);
        }

        Err(last_error
            .unwrap_or_else(|| StoreError::NetworkError("All retries exhausted".to_string())))
    }

    async fn backoff(&self, attempt: u32) {
        let backoff = calculate_backoff(attempt);
        debug!("Retrying after {:?}", backoff);
        tokio::time::sleep(backoff).await;
    }
}

#[async_trait]
impl SeriesStore for InfluxHttpClient {
    fn database(&self) -> &str {
        &self.database
    }

    async fn list_series(&self) -> StoreResult<Vec<String>> {
        let series = self
            .query(&query::show_measurements(), Method::GET, None)
            .await?;
        Ok(parser::measurement_names(&series))
    }

    async fn latest_timestamp(&self, series: &str) -> StoreResult<Option<DateTime<Utc>>> {
        let result = self
            .query(&query::latest_point(series), Method::GET, None)
            .await?;
        parser::first_timestamp(&result)
    }

    async fn count_in_range(&self, series: &str, window: &TimeWindow) -> StoreResult<u64> {
        let result = self
            .query(&query::count_in_range(series, window), Method::GET, None)
            .await?;
        Ok(parser::max_count(&result))
    }

    async fn fetch_in_range(&self, series: &str, window: &TimeWindow) -> StoreResult<Vec<Record>> {
        let result = self
            .query(&query::select_in_range(series, window), Method::GET, Some("ns"))
            .await?;
        Ok(parser::records(result))
    }

    async fn copy_in_range(
        &self,
        series: &str,
        window: &TimeWindow,
        destination: &CopyDestination,
    ) -> StoreResult<u64> {
        let statement = query::copy_in_range(&self.database, series, window, destination);
        let result = self.query(&statement, Method::POST, None).await?;
        Ok(parser::written_count(&result))
    }
}
