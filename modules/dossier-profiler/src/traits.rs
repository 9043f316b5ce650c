// Trait seams for the profiler's outbound I/O.
//
// PageFetcher hides the scraping backend, LanguageModel hides the chat
// completion backend. Production wiring uses FirecrawlClient and OpenAi;
// tests use MockFetcher and MockModel from `testing`.

use async_trait::async_trait;
use thiserror::Error;

use ai_client::{AiError, OpenAi};
use firecrawl_client::{FirecrawlClient, FirecrawlError, Format, ScrapeRequest};

// ---------------------------------------------------------------------------
// PageFetcher
// ---------------------------------------------------------------------------

/// What to fetch and how the backend should render it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub url: String,
    pub wait_for_ms: u64,
    pub only_main_content: bool,
    /// Server-side rendering budget, milliseconds.
    pub timeout_ms: Option<u64>,
}

impl PageRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            wait_for_ms: 0,
            only_main_content: true,
            timeout_ms: None,
        }
    }

    pub fn render_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).ok();
        self
    }

    pub fn wait_for(mut self, millis: u64) -> Self {
        self.wait_for_ms = millis;
        self
    }

    pub fn full_page(mut self) -> Self {
        self.only_main_content = false;
        self
    }
}

/// A rendered page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedPage {
    pub markdown: String,
    pub html: Option<String>,
    pub links: Vec<String>,
    pub title: Option<String>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl FetchedPage {
    pub fn markdown(markdown: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
            ..Default::default()
        }
    }

    pub fn has_text(&self) -> bool {
        !self.markdown.trim().is_empty()
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("timed out: {0}")]
    Timeout(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Timeouts, 408, 429, 5xx and connection failures.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout(_) | FetchError::Network(_) => true,
            FetchError::Http { status, .. } => matches!(status, 408 | 429) || *status >= 500,
            FetchError::Malformed(_) => false,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            FetchError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch and render one page to markdown.
    async fn fetch(&self, request: &PageRequest) -> Result<FetchedPage, FetchError>;
}

impl From<FirecrawlError> for FetchError {
    fn from(err: FirecrawlError) -> Self {
        match err {
            FirecrawlError::Timeout(msg) => FetchError::Timeout(msg),
            FirecrawlError::Network(msg) => FetchError::Network(msg),
            FirecrawlError::Api { status, message } => FetchError::Http { status, message },
            FirecrawlError::Unsuccessful(msg) | FirecrawlError::Parse(msg) => {
                FetchError::Malformed(msg)
            }
        }
    }
}

fn scrape_request(request: &PageRequest) -> ScrapeRequest {
    let scrape = ScrapeRequest::new(&request.url)
        .formats(vec![Format::Markdown, Format::Html, Format::Links])
        .only_main_content(request.only_main_content)
        .wait_for(request.wait_for_ms);
    match request.timeout_ms {
        Some(millis) => scrape.timeout(millis),
        None => scrape,
    }
}

#[async_trait]
impl PageFetcher for FirecrawlClient {
    async fn fetch(&self, request: &PageRequest) -> Result<FetchedPage, FetchError> {
        let doc = self.scrape(&scrape_request(request)).await?;

        // Firecrawl reports the target site's own status separately from its envelope.
        if let Some(status) = doc.source_status().filter(|s| *s >= 400) {
            return Err(FetchError::Http {
                status,
                message: format!("target responded with {status}"),
            });
        }

        Ok(FetchedPage {
            title: doc.title().map(str::to_string),
            markdown: doc.markdown.unwrap_or_default(),
            html: doc.html,
            links: doc.links,
            metadata: doc.metadata,
        })
    }
}

// ---------------------------------------------------------------------------
// LanguageModel
// ---------------------------------------------------------------------------

/// JSON schema the model must answer with.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub name: String,
    pub schema: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    /// `Some` selects structured output, `None` free text.
    pub schema: Option<OutputSchema>,
}

impl CompletionRequest {
    pub fn text(system: impl Into<String>, user: impl Into<String>, temperature: f32) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature,
            schema: None,
        }
    }

    pub fn structured<T: ai_client::StructuredOutput>(
        system: impl Into<String>,
        user: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature,
            schema: Some(OutputSchema {
                name: <T as ai_client::StructuredOutput>::schema_name(),
                schema: T::openai_schema(),
            }),
        }
    }

    pub fn schema_name(&self) -> Option<&str> {
        self.schema.as_ref().map(|s| s.name.as_str())
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the raw completion text (JSON text in structured mode).
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AiError>;
}

#[async_trait]
impl LanguageModel for OpenAi {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AiError> {
        match &request.schema {
            Some(output) => {
                self.structured_output(
                    &request.system,
                    &request.user,
                    &output.name,
                    output.schema.clone(),
                    request.temperature,
                )
                .await
            }
            None => {
                self.chat_completion(&request.system, &request.user, request.temperature)
                    .await
            }
        }
    }
}
