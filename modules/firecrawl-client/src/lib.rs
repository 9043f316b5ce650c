pub mod error;
pub mod types;

pub use error::{FirecrawlError, Result};
pub use types::{Format, ScrapeRequest, ScrapedDocument};

use std::time::Duration;

use types::ScrapeResponse;

const DEFAULT_BASE_URL: &str = "https://api.firecrawl.dev";

pub struct FirecrawlClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FirecrawlClient {
    /// `timeout` bounds the whole HTTP exchange, including Firecrawl's own render time.
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FirecrawlError::Network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Render one URL via `/v1/scrape`.
    pub async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapedDocument> {
        let endpoint = format!("{}/v1/scrape", self.base_url);

        tracing::debug!(url = %request.url, "Firecrawl scrape");

        let resp = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(FirecrawlError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.text().await?;
        let envelope: ScrapeResponse = serde_json::from_str(&body)?;

        match envelope {
            ScrapeResponse {
                success: true,
                data: Some(doc),
                ..
            } => {
                tracing::debug!(
                    url = %request.url,
                    markdown_len = doc.markdown.as_deref().map_or(0, str::len),
                    "Firecrawl scrape complete"
                );
                Ok(doc)
            }
            ScrapeResponse { error, .. } => Err(FirecrawlError::Unsuccessful(
                error.unwrap_or_else(|| "no document returned".to_string()),
            )),
        }
    }
}
