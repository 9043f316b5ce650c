mod client;
pub(crate) mod schema;
pub(crate) mod types;

pub use schema::StructuredOutput;

use std::time::Duration;

use crate::error::Result;
use client::{OpenAiClient, OPENAI_API_URL};
use types::{ChatRequest, WireMessage};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_MAX_TOKENS: u32 = 2000;

// =============================================================================
// OpenAi
// =============================================================================

#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
    max_tokens: u32,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: OPENAI_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// HTTP timeout applied to every request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> Result<OpenAiClient> {
        OpenAiClient::new(&self.api_key, &self.base_url, self.timeout)
    }

    /// Free-text chat completion.
    pub async fn chat_completion(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String> {
        let request = ChatRequest::new(&self.model)
            .message(WireMessage::system(system))
            .message(WireMessage::user(user))
            .temperature(temperature)
            .token_limit(self.max_tokens);

        self.client()?.chat(&request).await
    }

    /// Structured completion against a raw JSON schema. Returns the JSON text.
    pub async fn structured_output(
        &self,
        system: &str,
        user: &str,
        schema_name: &str,
        schema: serde_json::Value,
        temperature: f32,
    ) -> Result<String> {
        let request = ChatRequest::new(&self.model)
            .message(WireMessage::system(system))
            .message(WireMessage::user(user))
            .temperature(temperature)
            .token_limit(self.max_tokens)
            .json_schema(schema_name, schema);

        self.client()?.chat(&request).await
    }
}

impl std::fmt::Debug for OpenAi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAi")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AiError;

    #[test]
    fn defaults() {
        let ai = OpenAi::new("sk-test", "gpt-4o-mini");
        assert_eq!(ai.model(), "gpt-4o-mini");
        assert_eq!(ai.base_url, OPENAI_API_URL);
        assert_eq!(ai.timeout, DEFAULT_TIMEOUT);
        assert_eq!(ai.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn builder_overrides() {
        let ai = OpenAi::new("sk-test", "gpt-4o-mini")
            .with_base_url("https://proxy.internal/v1")
            .with_timeout(Duration::from_secs(5))
            .with_max_tokens(800);
        assert_eq!(ai.base_url, "https://proxy.internal/v1");
        assert_eq!(ai.timeout, Duration::from_secs(5));
        assert_eq!(ai.max_tokens, 800);
    }

    #[test]
    fn debug_output_hides_api_key() {
        let ai = OpenAi::new("sk-secret-value", "gpt-4o-mini");
        let printed = format!("{ai:?}");
        assert!(!printed.contains("sk-secret-value"));
    }

    /// Serve one canned HTTP response and hand back the raw request.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(split) = text.find("\r\n\r\n") {
                    let length = text[..split]
                        .lines()
                        .find_map(|l| {
                            l.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if raw.len() >= split + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&raw).to_string()
        });
        (base_url, handle)
    }

    #[tokio::test]
    async fn token_cap_is_sent_with_every_request() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "hello"}, "finish_reason": "stop"}]}"#;
        let (base_url, server) = serve_once("HTTP/1.1 200 OK", body).await;

        let ai = OpenAi::new("sk-test", "gpt-4o-mini")
            .with_base_url(base_url)
            .with_max_tokens(321);
        let text = ai.chat_completion("system", "user", 0.0).await.unwrap();

        assert_eq!(text, "hello");
        let request = server.await.unwrap();
        assert!(request.contains(r#""max_tokens":321"#), "request was {request}");
    }

    #[tokio::test]
    async fn undecodable_success_body_is_a_parse_error() {
        let (base_url, _server) = serve_once("HTTP/1.1 200 OK", "<html>gateway splash page</html>").await;

        let ai = OpenAi::new("sk-test", "gpt-4o-mini").with_base_url(base_url);
        let err = ai.chat_completion("system", "user", 0.0).await.unwrap_err();

        assert!(matches!(err, AiError::Parse(_)), "got {err:?}");
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transient_error() {
        let ai = OpenAi::new("sk-test", "gpt-4o-mini")
            .with_base_url("http://127.0.0.1:9")
            .with_timeout(Duration::from_secs(2));
        let err = ai.chat_completion("system", "user", 0.0).await.unwrap_err();
        assert!(err.is_transient(), "got {err:?}");
    }
}
