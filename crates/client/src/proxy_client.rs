//! HTTP client for the generate-code proxy.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use services::services::code_generation::{ErrorResponse, GenerateCodeRequest, GenerateCodeResponse};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:8787/api/generate-code";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProxyClientError {
    #[error("network error: {0}")]
    Transport(String),
    /// The proxy answered with an error body; `message` is what it said.
    #[error("{message}")]
    Upstream { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Serde(String),
}

#[async_trait]
pub trait CodeProxy: Send + Sync {
    async fn generate(&self, request: &GenerateCodeRequest) -> Result<String, ProxyClientError>;
}

#[derive(Debug, Clone)]
pub struct HttpCodeProxy {
    http: Client,
    url: String,
}

impl HttpCodeProxy {
    // Generation can legitimately take a while; this only bounds a hung connection.
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

    pub fn new(url: impl Into<String>) -> Result<Self, ProxyClientError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProxyClientError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl CodeProxy for HttpCodeProxy {
    async fn generate(&self, request: &GenerateCodeRequest) -> Result<String, ProxyClientError> {
        let res = self
            .http
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| ProxyClientError::Transport(e.to_string()))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| ProxyClientError::Transport(e.to_string()))?;
        debug!(status = status.as_u16(), body_length = body.len(), "Proxy responded");

        decode_response(status.as_u16(), &body)
    }
}

fn decode_response(status: u16, body: &str) -> Result<String, ProxyClientError> {
    if (200..300).contains(&status) {
        return serde_json::from_str::<GenerateCodeResponse>(body)
            .map(|r| r.generated_code)
            .map_err(|e| ProxyClientError::Serde(e.to_string()));
    }

    let message = match serde_json::from_str::<ErrorResponse>(body) {
        Ok(error) => error.error,
        Err(_) => format!("HTTP error! status: {status}"),
    };
    warn!(status, error = %message, "Proxy returned an error");
    Err(ProxyClientError::Upstream { status, message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_body_yields_code() {
        let code = decode_response(200, r#"{"generatedCode":"void loop() {}"}"#).unwrap();
        assert_eq!(code, "void loop() {}");
    }

    #[test]
    fn error_body_message_is_surfaced() {
        let err = decode_response(
            500,
            r#"{"error":"Failed to generate code: rate limited: quota exceeded"}"#,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to generate code: rate limited: quota exceeded"
        );
    }

    #[test]
    fn non_json_error_falls_back_to_status() {
        let err = decode_response(502, "<html>bad gateway</html>").unwrap_err();
        assert_eq!(
            err,
            ProxyClientError::Upstream {
                status: 502,
                message: "HTTP error! status: 502".to_string()
            }
        );
    }

    #[test]
    fn malformed_success_body_is_reported() {
        assert!(matches!(
            decode_response(200, "{}"),
            Err(ProxyClientError::Serde(_))
        ));
    }
}
