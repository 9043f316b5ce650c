// Test mocks for the profiler.
//
// Two mocks matching the two trait boundaries:
// - MockFetcher (PageFetcher): URL fragment to page, error or hang, with a call log
// - MockModel (LanguageModel): schema name plus prompt fragment to reply, with call counting
//
// Plus fast settings so retry and timeout paths run in milliseconds.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use ai_client::AiError;
use dossier_common::{ModelSettings, ScrapeSettings};

use crate::traits::{CompletionRequest, FetchError, FetchedPage, LanguageModel, PageFetcher, PageRequest};

/// Scrape settings with short timeouts and delays.
pub fn fast_scrape_settings() -> ScrapeSettings {
    ScrapeSettings {
        timeout: Duration::from_millis(200),
        max_retries: 2,
        retry_delay: Duration::from_millis(10),
        ..Default::default()
    }
}

/// Model settings with short timeouts and delays.
pub fn fast_model_settings() -> ModelSettings {
    ModelSettings {
        timeout: Duration::from_millis(200),
        max_retries: 2,
        retry_delay: Duration::from_millis(10),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum MockPage {
    Page(FetchedPage),
    Error(FetchError),
    /// Never resolves.
    Hang,
}

struct PageRule {
    fragment: String,
    /// Replayed in order; the last one repeats.
    responses: Mutex<VecDeque<MockPage>>,
}

/// Routes each request to the first rule whose fragment occurs in the URL.
/// Unrouted URLs answer HTTP 404.
/// Builder pattern: `.on_page()`, `.on_markdown()`, `.on_error()`, `.on_hang()`, `.on_sequence()`.
pub struct MockFetcher {
    rules: Vec<PageRule>,
    calls: Mutex<Vec<String>>,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn on_sequence(mut self, url_fragment: &str, responses: Vec<MockPage>) -> Self {
        self.rules.push(PageRule {
            fragment: url_fragment.to_string(),
            responses: Mutex::new(responses.into()),
        });
        self
    }

    pub fn on_page(self, url_fragment: &str, page: FetchedPage) -> Self {
        self.on_sequence(url_fragment, vec![MockPage::Page(page)])
    }

    pub fn on_markdown(self, url_fragment: &str, markdown: &str) -> Self {
        self.on_page(url_fragment, FetchedPage::markdown(markdown))
    }

    pub fn on_error(self, url_fragment: &str, error: FetchError) -> Self {
        self.on_sequence(url_fragment, vec![MockPage::Error(error)])
    }

    pub fn on_hang(self, url_fragment: &str) -> Self {
        self.on_sequence(url_fragment, vec![MockPage::Hang])
    }

    /// Every URL requested, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self, url_fragment: &str) -> usize {
        self.calls()
            .iter()
            .filter(|url| url.contains(url_fragment))
            .count()
    }

    fn next_response(&self, url: &str) -> Option<MockPage> {
        let rule = self.rules.iter().find(|r| url.contains(&r.fragment))?;
        let mut queue = rule.responses.lock().ok()?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<FetchedPage, FetchError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.url.clone());
        }
        match self.next_response(&request.url) {
            Some(MockPage::Page(page)) => Ok(page),
            Some(MockPage::Error(err)) => Err(err),
            Some(MockPage::Hang) => {
                std::future::pending::<()>().await;
                Err(FetchError::Timeout("unreachable".into()))
            }
            None => Err(FetchError::Http {
                status: 404,
                message: format!("MockFetcher: nothing registered for {}", request.url),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// MockModel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    /// Fails with a retryable (`true`) or permanent (`false`) error.
    Fail { transient: bool },
    /// Never resolves.
    Hang,
}

struct ReplyRule {
    /// `None` matches free-text requests.
    schema: Option<String>,
    prompt_fragment: Option<String>,
    reply: MockReply,
}

impl ReplyRule {
    fn matches(&self, request: &CompletionRequest) -> bool {
        let schema_ok = match (&self.schema, request.schema_name()) {
            (Some(expected), Some(actual)) => expected == actual,
            (None, None) => true,
            _ => false,
        };
        let prompt_ok = self
            .prompt_fragment
            .as_ref()
            .map_or(true, |fragment| request.user.contains(fragment.as_str()));
        schema_ok && prompt_ok
    }
}

/// Routes requests to the first rule matching schema name and prompt fragment.
/// Unmatched requests fail with a permanent error.
pub struct MockModel {
    rules: Vec<ReplyRule>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MockModel {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn rule(mut self, schema: Option<&str>, prompt_fragment: Option<&str>, reply: MockReply) -> Self {
        self.rules.push(ReplyRule {
            schema: schema.map(str::to_string),
            prompt_fragment: prompt_fragment.map(str::to_string),
            reply,
        });
        self
    }

    /// Structured reply for every request against `schema`.
    pub fn on_schema(self, schema: &str, json: &str) -> Self {
        self.rule(Some(schema), None, MockReply::Text(json.to_string()))
    }

    /// Structured reply for `schema` requests whose prompt contains `fragment`.
    pub fn on_schema_containing(self, schema: &str, fragment: &str, json: &str) -> Self {
        self.rule(Some(schema), Some(fragment), MockReply::Text(json.to_string()))
    }

    pub fn on_schema_reply(self, schema: &str, reply: MockReply) -> Self {
        self.rule(Some(schema), None, reply)
    }

    /// Free-text reply.
    pub fn on_text(self, reply: &str) -> Self {
        self.rule(None, None, MockReply::Text(reply.to_string()))
    }

    pub fn on_text_reply(self, reply: MockReply) -> Self {
        self.rule(None, None, reply)
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    /// Calls made against `schema`.
    pub fn calls_for(&self, schema: &str) -> usize {
        self.calls
            .lock()
            .map(|c| c.iter().filter(|r| r.schema_name() == Some(schema)).count())
            .unwrap_or_default()
    }

    /// Free-text calls.
    pub fn text_calls(&self) -> usize {
        self.calls
            .lock()
            .map(|c| c.iter().filter(|r| r.schema.is_none()).count())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AiError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }
        let reply = self
            .rules
            .iter()
            .find(|rule| rule.matches(request))
            .map(|rule| rule.reply.clone());

        match reply {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Fail { transient: true }) => {
                Err(AiError::Network("MockModel: connection reset".into()))
            }
            Some(MockReply::Fail { transient: false }) => Err(AiError::Api {
                status: 400,
                message: "MockModel: bad request".into(),
            }),
            Some(MockReply::Hang) => {
                std::future::pending::<()>().await;
                Err(AiError::EmptyResponse)
            }
            None => Err(AiError::Api {
                status: 400,
                message: format!(
                    "MockModel: no reply registered for schema {:?}",
                    request.schema_name()
                ),
            }),
        }
    }
}
