use crate::error::WatchError;
use reqwest::RequestBuilder;
use serde_json::Value;
use std::time::Duration;
use tokio::time::timeout;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::warn;

const MAX_ERROR_BODY: usize = 200;

/// Thin wrapper over `reqwest::Client` that bounds every call with a timeout
/// and retries transient failures with exponential backoff.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    request_timeout: Duration,
    max_retries: usize,
}

impl HttpClient {
    pub fn new(request_timeout: Duration, max_retries: usize) -> Result<Self, WatchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("wallet-watcher/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WatchError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(HttpClient {
            client,
            request_timeout,
            max_retries,
        })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    fn retry_strategy(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(100)
            .factor(2)
            .max_delay(Duration::from_secs(5))
            .map(jitter)
            .take(self.max_retries)
    }

    /// Sends the request produced by `build`, rebuilding it for each retry,
    /// and decodes a JSON body from a 2xx response.
    pub async fn execute_json<F>(&self, label: &str, build: F) -> Result<Value, WatchError>
    where
        F: Fn() -> RequestBuilder,
    {
        RetryIf::spawn(
            self.retry_strategy(),
            || {
                let request = build();
                async move {
                    let result = self.execute_once(request).await;
                    if let Err(e) = &result {
                        if e.is_transient() {
                            warn!("{} failed ({}), will retry if attempts remain", label, e);
                        }
                    }
                    result
                }
            },
            |e: &WatchError| e.is_transient(),
        )
        .await
    }

    async fn execute_once(&self, request: RequestBuilder) -> Result<Value, WatchError> {
        let response = match timeout(self.request_timeout, request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(WatchError::Timeout(self.request_timeout)),
        };

        let status = response.status();
        let body = match timeout(self.request_timeout, response.text()).await {
            Ok(Ok(body)) => body,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(WatchError::Timeout(self.request_timeout)),
        };

        if !status.is_success() {
            return Err(WatchError::UpstreamStatus {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| WatchError::UpstreamFormat(e.to_string()))
    }
}

fn truncate(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY {
        body.to_string()
    } else {
        let cut: String = body.chars().take(MAX_ERROR_BODY).collect();
        format!("{cut}...")
    }
}
