//! Client for the text-generation API that writes the component code.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

#[derive(Debug, Clone, Error)]
pub enum GenerationApiError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {message}")]
    Http { status: u16, message: String },
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("invalid api key")]
    InvalidApiKey,
    #[error("json error: {0}")]
    Serde(String),
    #[error("missing api key: {0} environment variable not set")]
    MissingApiKey(String),
}

/// Something that turns a prompt into generated text with a given model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, model: &str) -> Result<String, GenerationApiError>;
}

/// Produces a [`TextGenerator`] for a single request.
///
/// Credentials are resolved inside `connect`, so every request sees the
/// current environment.
pub trait GeneratorFactory: Send + Sync {
    fn connect(&self) -> Result<Arc<dyn TextGenerator>, GenerationApiError>;
}

/// Reads the API key from the environment on every `connect`.
#[derive(Debug, Clone)]
pub struct EnvGeneratorFactory {
    api_key_var: String,
    api_url: String,
}

impl EnvGeneratorFactory {
    pub fn new(api_key_var: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            api_key_var: api_key_var.into(),
            api_url: api_url.into(),
        }
    }
}

impl Default for EnvGeneratorFactory {
    fn default() -> Self {
        Self::new(API_KEY_ENV, DEFAULT_API_URL)
    }
}

impl GeneratorFactory for EnvGeneratorFactory {
    fn connect(&self) -> Result<Arc<dyn TextGenerator>, GenerationApiError> {
        let api_key = utils::env::read_secret(&self.api_key_var)
            .map_err(|_| GenerationApiError::MissingApiKey(self.api_key_var.clone()))?;
        let client = ClaudeApiClient::new(api_key, self.api_url.clone())?;
        Ok(Arc::new(client))
    }
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct ClaudeResponse {
    pub id: String,
    pub content: Vec<ContentBlock>,
    pub model: String,
    pub stop_reason: Option<String>,
}

impl ClaudeResponse {
    /// All text blocks joined in order, untouched otherwise.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Anthropic Messages API client. One HTTP request per call, no retries.
#[derive(Clone)]
pub struct ClaudeApiClient {
    http: Client,
    api_key: String,
    api_url: String,
}

impl std::fmt::Debug for ClaudeApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeApiClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl ClaudeApiClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

    pub fn new(api_key: String, api_url: String) -> Result<Self, GenerationApiError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("circuit-coder/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GenerationApiError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_key,
            api_url,
        })
    }

    pub async fn complete(
        &self,
        model: &str,
        messages: Vec<Message>,
    ) -> Result<ClaudeResponse, GenerationApiError> {
        let request = ClaudeRequest {
            model,
            max_tokens: MAX_TOKENS,
            messages,
        };

        let res = self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match res.status() {
            s if s.is_success() => res
                .json::<ClaudeResponse>()
                .await
                .map_err(|e| GenerationApiError::Serde(e.to_string())),
            StatusCode::UNAUTHORIZED => Err(GenerationApiError::InvalidApiKey),
            StatusCode::TOO_MANY_REQUESTS => {
                let body = res.text().await.unwrap_or_default();
                Err(GenerationApiError::RateLimited(upstream_message(&body)))
            }
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(GenerationApiError::Http {
                    status,
                    message: upstream_message(&body),
                })
            }
        }
    }
}

#[async_trait]
impl TextGenerator for ClaudeApiClient {
    async fn generate(&self, prompt: &str, model: &str) -> Result<String, GenerationApiError> {
        let response = self.complete(model, vec![Message::user(prompt)]).await?;
        debug!(
            response_id = %response.id,
            model = %response.model,
            stop_reason = ?response.stop_reason,
            "Generation API responded"
        );
        Ok(response.text())
    }
}

fn map_reqwest_error(e: reqwest::Error) -> GenerationApiError {
    if e.is_timeout() {
        GenerationApiError::Timeout
    } else {
        GenerationApiError::Transport(e.without_url().to_string())
    }
}

/// Pull the human-readable reason out of an upstream error body, falling back
/// to the raw body.
fn upstream_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.trim().is_empty() => "empty error body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}
