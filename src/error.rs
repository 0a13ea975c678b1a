use backoff::backoff::Backoff;
use backoff::exponential::ExponentialBackoff;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum CuratorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{resource_type} not found: {resource_id}")]
    NotFound {
        resource_type: String,
        resource_id: String,
    },

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Provider error (HTTP {status_code}): {message}")]
    Provider {
        message: String,
        status_code: u16,
        quota_exceeded: bool,
        retryable: bool,
    },

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Failed to normalize record: {0}")]
    Normalization(String),

    #[error("Filter evaluation error: {0}")]
    Filter(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CuratorError>;

impl CuratorError {
    /// Build a provider error from an upstream HTTP status, deriving the
    /// quota-exceeded and retryable flags the way providers signal them:
    /// quota exhaustion is a 403 mentioning "quota", retryable is 5xx or 429.
    pub fn provider(message: impl Into<String>, status_code: u16) -> Self {
        let message = message.into();
        let quota_exceeded = status_code == 403
            && (message.contains("quota") || message.contains("quotaExceeded"));
        let retryable = status_code >= 500 || status_code == 429;
        CuratorError::Provider {
            message,
            status_code,
            quota_exceeded,
            retryable,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            CuratorError::Provider { status_code, .. } => Some(*status_code),
            CuratorError::NotFound { .. } => Some(404),
            CuratorError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// Quota exhaustion is explicitly non-retryable even though it arrives
    /// as a status that would otherwise qualify.
    pub fn is_retryable(&self) -> bool {
        match self {
            CuratorError::Provider {
                retryable,
                quota_exceeded,
                ..
            } => *retryable && !*quota_exceeded,
            CuratorError::Http(e) => {
                if let Some(status) = e.status() {
                    status.is_server_error() || status.as_u16() == 429
                } else {
                    e.is_timeout() || e.is_connect()
                }
            }
            _ => false,
        }
    }
}

/// Retry an operation with exponential backoff and jitter. Only errors that
/// report themselves retryable are retried; everything else surfaces
/// immediately.
pub async fn retry_with_backoff<T, F, Fut>(
    mut operation: F,
    max_retries: u32,
    base_delay: Duration,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
        current_interval: base_delay,
        initial_interval: base_delay,
        max_interval: Duration::from_secs(30),
        multiplier: 2.0,
        max_elapsed_time: None,
        ..Default::default()
    };

    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_retries => {
                let delay = backoff.next_backoff().unwrap_or(base_delay);
                warn!(
                    "Attempt {} failed ({}), retrying in {:?}",
                    attempt + 1,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
