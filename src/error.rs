use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("network error: {0}")]
    TransientNetwork(String),

    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("upstream returned HTTP {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("unexpected upstream payload: {0}")]
    UpstreamFormat(String),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl WatchError {
    /// Errors worth retrying within the same request. Everything else waits
    /// for the next cycle.
    pub fn is_transient(&self) -> bool {
        match self {
            WatchError::TransientNetwork(_) | WatchError::Timeout(_) => true,
            WatchError::UpstreamStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        WatchError::Configuration(msg.into())
    }
}

impl From<reqwest::Error> for WatchError {
    fn from(e: reqwest::Error) -> Self {
        // Telegram puts the bot token in the path, never echo the URL.
        let e = e.without_url();
        if e.is_decode() {
            WatchError::UpstreamFormat(e.to_string())
        } else if e.is_timeout() {
            WatchError::TransientNetwork(format!("timeout: {e}"))
        } else if let Some(status) = e.status() {
            WatchError::UpstreamStatus {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else {
            WatchError::TransientNetwork(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(WatchError::TransientNetwork("reset".into()).is_transient());
        assert!(WatchError::Timeout(Duration::from_secs(3)).is_transient());
        assert!(
            WatchError::UpstreamStatus {
                status: 503,
                body: String::new()
            }
            .is_transient()
        );
        assert!(
            WatchError::UpstreamStatus {
                status: 429,
                body: String::new()
            }
            .is_transient()
        );
        assert!(
            !WatchError::UpstreamStatus {
                status: 404,
                body: String::new()
            }
            .is_transient()
        );
        assert!(!WatchError::UpstreamFormat("bad".into()).is_transient());
        assert!(!WatchError::Delivery("chat not found".into()).is_transient());
    }

    #[test]
    fn timeout_message_reports_seconds() {
        let err = WatchError::Timeout(Duration::from_secs(10));
        assert_eq!(err.to_string(), "request timed out after 10s");
    }
}
