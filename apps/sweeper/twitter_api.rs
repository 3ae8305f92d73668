use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{
    Client, Method, StatusCode,
    header::{AUTHORIZATION, HeaderMap, HeaderValue, RETRY_AFTER, USER_AGENT},
};
use serde::de::DeserializeOwned;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    TIMELINE_PAGE_SIZE,
    config::{ApiConfig, Credentials},
    models::posts::Post,
    oauth,
};

const DEFAULT_MAX_RETRIES: usize = 5;
const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const RATE_LIMIT_RESET: &str = "x-rate-limit-reset";

/// The two calls the sweeper and the batch deleter need from the API.
#[async_trait]
pub trait PostApi: Send + Sync {
    /// Up to 200 posts of the authenticated account, reposts included,
    /// optionally bounded by `max_id`.
    async fn list_timeline(&self, max_id: Option<u64>) -> Result<Vec<Post>>;

    async fn delete_post(&self, id: u64) -> Result<()>;
}

#[derive(Clone)]
pub struct TwitterApi {
    client: Client,
    credentials: Credentials,
    pub base_url: String,
    max_retries: usize,
    initial_backoff: Duration,
}

impl TwitterApi {
    pub fn new_with_endpoint(credentials: Credentials, base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .default_headers(Self::default_headers())
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            credentials,
            base_url: base_url.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::new_with_endpoint(config.credentials.clone(), config.base_url.clone())
    }

    pub fn with_retries(mut self, max_retries: usize, initial_backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.initial_backoff = initial_backoff;
        self
    }

    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static("post-retention-sweeper/0.1 reqwest/0.12"),
        );
        headers
    }

    #[instrument(skip(self))]
    pub async fn user_timeline(&self, max_id: Option<u64>) -> Result<Vec<Post>> {
        let mut params = vec![
            ("count".to_string(), TIMELINE_PAGE_SIZE.to_string()),
            ("include_rts".to_string(), "true".to_string()),
        ];
        if let Some(max_id) = max_id {
            info!(max_id, "Getting timeline before cursor");
            params.push(("max_id".to_string(), max_id.to_string()));
        }

        self.call(Method::GET, "/statuses/user_timeline.json", &params)
            .await
    }

    /// Deletes a post and returns it as the API echoes it back.
    #[instrument(skip(self))]
    pub async fn destroy_post(&self, id: u64) -> Result<Post> {
        let params = vec![("trim_user".to_string(), "true".to_string())];
        self.call(Method::POST, &format!("/statuses/destroy/{id}.json"), &params)
            .await
    }

    async fn call<T>(&self, method: Method, endpoint: &str, params: &[(String, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        let body = self.execute_request(&method, &url, params).await?;
        serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse response from {endpoint}"))
    }

    async fn execute_request(
        &self,
        method: &Method,
        url: &str,
        params: &[(String, String)],
    ) -> Result<String> {
        let mut attempt = 0;
        let mut delay = self.initial_backoff;

        loop {
            // Nonce and timestamp must be fresh on every attempt
            let authorization =
                oauth::authorization_header(&self.credentials, method.as_str(), url, params)?;

            let request = self
                .client
                .request(method.clone(), url)
                .query(params)
                .header(AUTHORIZATION, authorization);

            match request.send().await {
                Ok(response) => match response.status() {
                    status if status.is_success() => {
                        debug!(url, status = %status, "Request successful");
                        return response
                            .text()
                            .await
                            .context("Failed to get response text");
                    }
                    StatusCode::TOO_MANY_REQUESTS => {
                        attempt += 1;
                        if attempt > self.max_retries {
                            error!(url, attempt, "Max retries reached. Last error: HTTP 429");
                            return Err(anyhow!("Max retries reached. Last error: HTTP 429"));
                        }

                        let retry_after = Self::get_retry_after(response.headers(), delay);
                        warn!(url, attempt, retry_after = ?retry_after, "Rate limited, retrying");
                        sleep(retry_after).await;
                        delay = delay.max(retry_after) * 2;
                    }
                    status if status.is_server_error() => {
                        attempt += 1;
                        if attempt > self.max_retries {
                            error!(url, status = %status, attempt, "Max retries reached. Server error");
                            return Err(anyhow!("Max retries reached. Last error: HTTP {}", status));
                        }

                        warn!(url, status = %status, attempt, delay = ?delay, "Server error, retrying");
                        sleep(delay).await;
                        delay *= 2;
                    }
                    status => {
                        let body = response.text().await.unwrap_or_default();
                        error!(url, status = %status, body, "Request failed");
                        return Err(anyhow!("Request failed with status {}: {}", status, body));
                    }
                },
                Err(e) if !method.is_idempotent() => {
                    // The post may already be gone; a resend would only see a 404
                    error!(url, method = %method, error = ?e, "Request error, not retrying");
                    return Err(anyhow!("Request error: {}", e));
                }
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        error!(url, error = ?e, attempt, "Max retries reached");
                        return Err(anyhow!("Max retries reached. Last error: {}", e));
                    }
                    warn!(url, error = ?e, attempt, delay = ?delay, "Request error, retrying");
                    sleep(delay).await;
                    delay *= 2; // Exponential backoff
                }
            }
        }
    }

    /// `Retry-After` wins; otherwise wait for the window reset the API
    /// announces as an epoch second; otherwise `default`.
    fn get_retry_after(headers: &HeaderMap, default: Duration) -> Duration {
        let header_u64 = |name: &str| {
            headers
                .get(name)
                .and_then(|h: &HeaderValue| h.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
        };

        if let Some(secs) = header_u64(RETRY_AFTER.as_str()) {
            return Duration::from_secs(secs);
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        header_u64(RATE_LIMIT_RESET)
            .map(|reset| Duration::from_secs(reset.saturating_sub(now)))
            .unwrap_or(default)
    }
}

#[async_trait]
impl PostApi for TwitterApi {
    async fn list_timeline(&self, max_id: Option<u64>) -> Result<Vec<Post>> {
        self.user_timeline(max_id).await
    }

    async fn delete_post(&self, id: u64) -> Result<()> {
        self.destroy_post(id).await.map(|_| ())
    }
}
