use thiserror::Error;

pub type Result<T> = std::result::Result<T, AiError>;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Empty response from model")]
    EmptyResponse,
}

impl AiError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            AiError::Network(_) | AiError::Timeout(_) | AiError::RateLimited(_) => true,
            AiError::Api { status, .. } => *status == 408 || *status >= 500,
            AiError::Config(_) | AiError::Parse(_) | AiError::EmptyResponse => false,
        }
    }
}

impl From<reqwest::Error> for AiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AiError::Parse(e.to_string())
        } else if e.is_timeout() {
            AiError::Timeout(e.to_string())
        } else {
            AiError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for AiError {
    fn from(e: serde_json::Error) -> Self {
        AiError::Parse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limits_and_server_errors_are_transient() {
        assert!(AiError::RateLimited("slow down".into()).is_transient());
        assert!(AiError::Timeout("60s".into()).is_transient());
        assert!(AiError::Api {
            status: 503,
            message: "overloaded".into()
        }
        .is_transient());
    }

    #[test]
    fn client_errors_are_not_transient() {
        assert!(!AiError::Api {
            status: 401,
            message: "bad key".into()
        }
        .is_transient());
        assert!(!AiError::Parse("eof".into()).is_transient());
        assert!(!AiError::EmptyResponse.is_transient());
    }
}
