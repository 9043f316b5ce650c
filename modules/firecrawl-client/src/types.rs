use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Output formats Firecrawl can render a page into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Format {
    Markdown,
    Html,
    RawHtml,
    Links,
}

/// Body of `POST /v1/scrape`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    pub url: String,
    pub formats: Vec<Format>,
    pub only_main_content: bool,
    /// Milliseconds to wait for client-side rendering before capture.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_for: Option<u64>,
    /// Server-side scrape timeout in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl ScrapeRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            formats: vec![Format::Markdown, Format::Html],
            only_main_content: true,
            wait_for: None,
            timeout: None,
        }
    }

    pub fn formats(mut self, formats: Vec<Format>) -> Self {
        self.formats = formats;
        self
    }

    pub fn only_main_content(mut self, only_main_content: bool) -> Self {
        self.only_main_content = only_main_content;
        self
    }

    pub fn wait_for(mut self, millis: u64) -> Self {
        self.wait_for = Some(millis);
        self
    }

    pub fn timeout(mut self, millis: u64) -> Self {
        self.timeout = Some(millis);
        self
    }
}

/// Envelope returned by `/v1/scrape`.
#[derive(Debug, Deserialize)]
pub(crate) struct ScrapeResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<ScrapedDocument>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One rendered page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScrapedDocument {
    #[serde(default)]
    pub markdown: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ScrapedDocument {
    /// HTTP status the target site answered with, as reported by Firecrawl.
    pub fn source_status(&self) -> Option<u16> {
        self.metadata
            .get("statusCode")
            .and_then(Value::as_u64)
            .and_then(|code| u16::try_from(code).ok())
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.get("title").and_then(Value::as_str)
    }
}
