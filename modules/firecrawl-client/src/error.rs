use thiserror::Error;

pub type Result<T> = std::result::Result<T, FirecrawlError>;

#[derive(Debug, Error)]
pub enum FirecrawlError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Scrape unsuccessful: {0}")]
    Unsuccessful(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl FirecrawlError {
    /// Timeouts, rate limits and server-side failures may clear on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            FirecrawlError::Network(_) | FirecrawlError::Timeout(_) => true,
            FirecrawlError::Api { status, .. } => {
                matches!(status, 408 | 429) || *status >= 500
            }
            FirecrawlError::Unsuccessful(_) | FirecrawlError::Parse(_) => false,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            FirecrawlError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FirecrawlError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FirecrawlError::Timeout(err.to_string())
        } else if err.is_decode() {
            FirecrawlError::Parse(err.to_string())
        } else {
            FirecrawlError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FirecrawlError {
    fn from(err: serde_json::Error) -> Self {
        FirecrawlError::Parse(err.to_string())
    }
}
