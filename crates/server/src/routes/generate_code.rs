use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    routing::post,
};
use services::services::code_generation::{GenerateCodeRequest, GenerateCodeResponse};
use tracing::warn;

use crate::{AppState, error::ApiError};

/// POST /api/generate-code
/// Validate the request, make one generation call and return the text unchanged
pub async fn generate_code(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<GenerateCodeResponse>, ApiError> {
    let request = parse_request(&body)?;
    let generated_code = state.code_generation.generate(request).await?;
    Ok(Json(GenerateCodeResponse { generated_code }))
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// An empty body is treated as an empty object so it fails field validation
/// rather than JSON parsing.
fn parse_request(body: &[u8]) -> Result<GenerateCodeRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(GenerateCodeRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "Rejected malformed generate-code body");
        ApiError::BadRequest(format!("Invalid JSON body: {e}"))
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/generate-code",
        post(generate_code).fallback(method_not_allowed),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use serde_json::{Value, json};
    use services::services::generation_api::{
        GenerationApiError, GeneratorFactory, TextGenerator,
    };
    use tower::ServiceExt;

    use crate::{AppState, router as app_router};

    struct CannedGenerator {
        reply: Result<String, GenerationApiError>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TextGenerator for CannedGenerator {
        async fn generate(&self, _prompt: &str, _model: &str) -> Result<String, GenerationApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    struct CannedFactory {
        reply: Option<Result<String, GenerationApiError>>,
        calls: Arc<AtomicUsize>,
    }

    impl GeneratorFactory for CannedFactory {
        fn connect(&self) -> Result<Arc<dyn TextGenerator>, GenerationApiError> {
            match &self.reply {
                Some(reply) => Ok(Arc::new(CannedGenerator {
                    reply: reply.clone(),
                    calls: self.calls.clone(),
                })),
                None => Err(GenerationApiError::MissingApiKey("ANTHROPIC_API_KEY".to_string())),
            }
        }
    }

    fn app(reply: Option<Result<String, GenerationApiError>>) -> (axum::Router, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let factory = CannedFactory {
            reply,
            calls: calls.clone(),
        };
        (app_router(AppState::new(Arc::new(factory))), calls)
    }

    async fn send(app: axum::Router, method: Method, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri("/api/generate-code")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn success_returns_generated_text_unchanged() {
        let text = "#include <Servo.h>\n\nvoid setup() {}\r\nvoid loop() {}   \n";
        let (app, calls) = app(Some(Ok(text.to_string())));

        let (status, body) = send(
            app,
            Method::POST,
            r#"{"selectedComponent":"LED","description":"blink every second"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "generatedCode": text }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_post_methods_are_rejected_without_reading_the_body() {
        for method in [Method::GET, Method::PUT, Method::DELETE, Method::PATCH] {
            let (app, calls) = app(Some(Ok("unused".to_string())));
            let (status, body) = send(app, method.clone(), "this is not json").await;

            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{method}");
            assert_eq!(body["error"], "Method Not Allowed");
            assert_eq!(calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn missing_fields_are_client_errors_without_upstream_call() {
        let bodies = [
            "",
            "{}",
            r#"{"selectedComponent":"LED"}"#,
            r#"{"description":"blink"}"#,
            r#"{"selectedComponent":"","description":"blink"}"#,
            r#"{"selectedComponent":"LED","description":""}"#,
        ];

        for raw in bodies {
            let (app, calls) = app(Some(Ok("unused".to_string())));
            let (status, body) = send(app, Method::POST, raw).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "body {raw:?}");
            let error = body["error"].as_str().unwrap();
            assert!(error.starts_with("Missing required fields"), "{error}");
            assert_eq!(calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn malformed_json_is_a_client_error() {
        let (app, calls) = app(Some(Ok("unused".to_string())));
        let (status, body) = send(app, Method::POST, "{not json").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_credential_is_a_server_error() {
        let (app, _) = app(None);
        let (status, body) = send(
            app,
            Method::POST,
            r#"{"selectedComponent":"LED","description":"blink"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let error = body["error"].as_str().unwrap();
        assert!(error.starts_with("Server configuration error"));
        assert!(!error.contains("ANTHROPIC_API_KEY"));
    }

    #[tokio::test]
    async fn upstream_failure_is_a_server_error_with_reason() {
        let (app, calls) = app(Some(Err(GenerationApiError::Http {
            status: 429,
            message: "quota exceeded".to_string(),
        })));
        let (status, body) = send(
            app,
            Method::POST,
            r#"{"selectedComponent":"LED","description":"blink"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("quota exceeded"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _) = app(None);
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
