use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::DossierError;

/// How Source Adapters talk to the scraping backend.
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    /// Per-attempt bound.
    pub timeout: Duration,
    /// Retries after the first attempt, transient failures only.
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Milliseconds the backend waits for client-side rendering.
    pub wait_for_ms: u64,
    pub max_posts: usize,
    pub max_articles: usize,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 2,
            retry_delay: Duration::from_secs(2),
            wait_for_ms: 2000,
            max_posts: 10,
            max_articles: 5,
        }
    }
}

/// How the Extraction Service calls the language model.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Raw text longer than this is cut before prompting.
    pub max_content_chars: usize,
    /// Completion token cap sent with every request.
    pub max_tokens: u32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_retries: 2,
            retry_delay: Duration::from_secs(2),
            max_content_chars: 15_000,
            max_tokens: 2000,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Scraping backend
    pub firecrawl_api_key: String,
    pub firecrawl_base_url: Option<String>,

    // Language model
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: Option<String>,

    pub scrape: ScrapeSettings,
    pub model: ModelSettings,

    /// Upper bound on one profiling request, end to end.
    pub request_timeout: Duration,

    // Web server
    pub web_host: String,
    pub web_port: u16,
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, DossierError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DossierError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| DossierError::Config(format!("{key} environment variable is required")))
        };

        let scrape_defaults = ScrapeSettings::default();
        let model_defaults = ModelSettings::default();

        Ok(Self {
            firecrawl_api_key: required("FIRECRAWL_API_KEY")?,
            firecrawl_base_url: get("FIRECRAWL_BASE_URL"),
            openai_api_key: required("OPENAI_API_KEY")?,
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            openai_base_url: get("OPENAI_BASE_URL"),
            scrape: ScrapeSettings {
                timeout: secs(get("FIRECRAWL_TIMEOUT"), "FIRECRAWL_TIMEOUT", scrape_defaults.timeout)?,
                max_retries: parsed(get("SCRAPE_MAX_RETRIES"), "SCRAPE_MAX_RETRIES", scrape_defaults.max_retries)?,
                retry_delay: secs(get("SCRAPE_RETRY_DELAY"), "SCRAPE_RETRY_DELAY", scrape_defaults.retry_delay)?,
                wait_for_ms: parsed(get("FIRECRAWL_WAIT_FOR"), "FIRECRAWL_WAIT_FOR", scrape_defaults.wait_for_ms)?,
                ..scrape_defaults
            },
            model: ModelSettings {
                timeout: secs(get("LLM_TIMEOUT"), "LLM_TIMEOUT", model_defaults.timeout)?,
                max_retries: parsed(get("LLM_MAX_RETRIES"), "LLM_MAX_RETRIES", model_defaults.max_retries)?,
                retry_delay: secs(get("LLM_RETRY_DELAY"), "LLM_RETRY_DELAY", model_defaults.retry_delay)?,
                max_tokens: parsed(get("LLM_MAX_TOKENS"), "LLM_MAX_TOKENS", model_defaults.max_tokens)?,
                ..model_defaults
            },
            request_timeout: secs(get("REQUEST_TIMEOUT"), "REQUEST_TIMEOUT", Duration::from_secs(120))?,
            web_host: get("WEB_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            web_port: parsed(get("PORT"), "PORT", 8000)?,
        })
    }

    /// Log the loaded configuration with secrets masked.
    pub fn log_redacted(&self) {
        tracing::info!(
            firecrawl_api_key = %redact(&self.firecrawl_api_key),
            firecrawl_base_url = self.firecrawl_base_url.as_deref().unwrap_or("default"),
            openai_api_key = %redact(&self.openai_api_key),
            openai_model = %self.openai_model,
            scrape_timeout_secs = self.scrape.timeout.as_secs_f64(),
            scrape_max_retries = self.scrape.max_retries,
            llm_timeout_secs = self.model.timeout.as_secs_f64(),
            llm_max_retries = self.model.max_retries,
            llm_max_tokens = self.model.max_tokens,
            request_timeout_secs = self.request_timeout.as_secs_f64(),
            web_host = %self.web_host,
            web_port = self.web_port,
            "Configuration loaded"
        );
    }
}

fn parsed<T: FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T, DossierError> {
    match raw {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| DossierError::Config(format!("{key} must be a number, got {v:?}"))),
    }
}

/// Durations are given in (possibly fractional) seconds.
fn secs(raw: Option<String>, key: &str, default: Duration) -> Result<Duration, DossierError> {
    match raw {
        None => Ok(default),
        Some(v) => match v.parse::<f64>() {
            Ok(s) if s.is_finite() && s >= 0.0 => Ok(Duration::from_secs_f64(s)),
            _ => Err(DossierError::Config(format!(
                "{key} must be a non-negative number of seconds, got {v:?}"
            ))),
        },
    }
}

fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{prefix}****")
    }
}
