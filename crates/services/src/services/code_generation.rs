//! Request validation and the single generation call behind the proxy endpoint.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};
use ts_rs::TS;

use super::{
    generation_api::{DEFAULT_MODEL, GenerationApiError, GeneratorFactory},
    prompt::render_component_prompt,
};

/// Body accepted by the proxy endpoint. Fields are optional here so that
/// missing values can be reported as a validation error rather than a
/// deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCodeRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl GenerateCodeRequest {
    pub fn new(component: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            selected_component: Some(component.into()),
            description: Some(description.into()),
            model: None,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn validate(self) -> Result<ValidatedRequest, CodeGenerationError> {
        let component = non_empty(self.selected_component);
        let description = non_empty(self.description);

        match (component, description) {
            (Some(component), Some(description)) => Ok(ValidatedRequest {
                component,
                description,
                model: non_empty(self.model).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            }),
            (component, description) => {
                let mut missing = Vec::new();
                if component.is_none() {
                    missing.push("selectedComponent");
                }
                if description.is_none() {
                    missing.push("description");
                }
                Err(CodeGenerationError::MissingFields(missing))
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCodeResponse {
    pub generated_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub component: String,
    pub description: String,
    pub model: String,
}

#[derive(Debug, Clone, Error)]
pub enum CodeGenerationError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Server configuration error: the generation API key is not configured.")]
    MissingCredential,
    #[error("Failed to generate code: {0}")]
    Upstream(GenerationApiError),
}

/// Validates a request, renders the prompt and makes exactly one call to the
/// generation API. Holds no per-request state.
#[derive(Clone)]
pub struct CodeGenerationService {
    generators: Arc<dyn GeneratorFactory>,
}

impl CodeGenerationService {
    pub fn new(generators: Arc<dyn GeneratorFactory>) -> Self {
        Self { generators }
    }

    pub async fn generate(&self, request: GenerateCodeRequest) -> Result<String, CodeGenerationError> {
        let request = request.validate()?;

        let generator = self.generators.connect().map_err(|e| match e {
            GenerationApiError::MissingApiKey(var) => {
                error!(env_var = %var, "Generation API key is not configured");
                CodeGenerationError::MissingCredential
            }
            other => {
                error!(error = %other, "Failed to initialise generation client");
                CodeGenerationError::Upstream(other)
            }
        })?;

        let prompt = render_component_prompt(&request.component, &request.description);

        info!(
            component = %request.component,
            model = %request.model,
            prompt_length = prompt.len(),
            "Requesting code generation"
        );

        let code = generator
            .generate(&prompt, &request.model)
            .await
            .map_err(|e| {
                error!(component = %request.component, error = %e, "Code generation failed");
                CodeGenerationError::Upstream(e)
            })?;

        info!(
            component = %request.component,
            code_length = code.len(),
            "Code generation completed"
        );

        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;

    use super::*;
    use crate::services::generation_api::TextGenerator;

    /// Records every prompt and answers with a canned result.
    struct ScriptedGenerator {
        reply: Result<String, GenerationApiError>,
        prompts: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str, model: &str) -> Result<String, GenerationApiError> {
            self.prompts
                .lock()
                .unwrap()
                .push((prompt.to_string(), model.to_string()));
            self.reply.clone()
        }
    }

    struct ScriptedFactory {
        generator: Option<Arc<ScriptedGenerator>>,
        connects: AtomicUsize,
    }

    impl ScriptedFactory {
        fn replying(reply: Result<String, GenerationApiError>) -> Arc<Self> {
            Arc::new(Self {
                generator: Some(Arc::new(ScriptedGenerator {
                    reply,
                    prompts: Mutex::new(Vec::new()),
                })),
                connects: AtomicUsize::new(0),
            })
        }

        fn without_key() -> Arc<Self> {
            Arc::new(Self {
                generator: None,
                connects: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.generator
                .as_ref()
                .map(|g| g.prompts.lock().unwrap().len())
                .unwrap_or(0)
        }
    }

    impl GeneratorFactory for ScriptedFactory {
        fn connect(&self) -> Result<Arc<dyn TextGenerator>, GenerationApiError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            match &self.generator {
                Some(g) => Ok(g.clone()),
                None => Err(GenerationApiError::MissingApiKey("TEST_KEY".to_string())),
            }
        }
    }

    #[tokio::test]
    async fn returns_generated_text_verbatim() {
        let text = "  // blink\nvoid setup() {}\nvoid loop() {}\n\n".to_string();
        let factory = ScriptedFactory::replying(Ok(text.clone()));
        let service = CodeGenerationService::new(factory.clone());

        let code = service
            .generate(GenerateCodeRequest::new("LED", "blink every second"))
            .await
            .unwrap();

        assert_eq!(code, text);
        assert_eq!(factory.calls(), 1);
    }

    #[tokio::test]
    async fn uses_default_model_when_none_or_blank() {
        let factory = ScriptedFactory::replying(Ok("ok".to_string()));
        let service = CodeGenerationService::new(factory.clone());

        service
            .generate(GenerateCodeRequest::new("LED", "blink").with_model(Some(" ".to_string())))
            .await
            .unwrap();

        let prompts = factory.generator.as_ref().unwrap().prompts.lock().unwrap();
        assert_eq!(prompts[0].1, DEFAULT_MODEL);
        assert!(prompts[0].0.contains("LED"));
    }

    #[tokio::test]
    async fn forwards_requested_model() {
        let factory = ScriptedFactory::replying(Ok("ok".to_string()));
        let service = CodeGenerationService::new(factory.clone());

        service
            .generate(
                GenerateCodeRequest::new("Buzzer", "beep")
                    .with_model(Some("claude-3-5-haiku-latest".to_string())),
            )
            .await
            .unwrap();

        let prompts = factory.generator.as_ref().unwrap().prompts.lock().unwrap();
        assert_eq!(prompts[0].1, "claude-3-5-haiku-latest");
    }

    #[tokio::test]
    async fn missing_fields_never_reach_the_generator() {
        let factory = ScriptedFactory::replying(Ok("unused".to_string()));
        let service = CodeGenerationService::new(factory.clone());

        let cases = [
            GenerateCodeRequest::default(),
            GenerateCodeRequest {
                selected_component: Some("LED".to_string()),
                ..Default::default()
            },
            GenerateCodeRequest {
                description: Some("blink".to_string()),
                ..Default::default()
            },
            GenerateCodeRequest::new("", "blink"),
            GenerateCodeRequest::new("LED", "   "),
        ];

        for request in cases {
            let err = service.generate(request).await.unwrap_err();
            assert!(matches!(err, CodeGenerationError::MissingFields(_)));
            assert!(!err.to_string().is_empty());
        }

        assert_eq!(factory.connects.load(Ordering::SeqCst), 0);
        assert_eq!(factory.calls(), 0);
    }

    #[test]
    fn missing_fields_message_names_each_field() {
        let err = GenerateCodeRequest::default().validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required fields: selectedComponent, description"
        );
    }

    #[tokio::test]
    async fn missing_key_is_a_configuration_error() {
        let service = CodeGenerationService::new(ScriptedFactory::without_key());

        let err = service
            .generate(GenerateCodeRequest::new("LED", "blink"))
            .await
            .unwrap_err();

        assert!(matches!(err, CodeGenerationError::MissingCredential));
    }

    #[tokio::test]
    async fn upstream_failure_embeds_reason() {
        let factory = ScriptedFactory::replying(Err(GenerationApiError::RateLimited(
            "quota exceeded".to_string(),
        )));
        let service = CodeGenerationService::new(factory.clone());

        let err = service
            .generate(GenerateCodeRequest::new("LED", "blink"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(factory.calls(), 1);
    }

    #[test]
    fn request_uses_camel_case_wire_names() {
        let request: GenerateCodeRequest = serde_json::from_str(
            r#"{"selectedComponent":"LED","description":"blink","model":"m"}"#,
        )
        .unwrap();
        assert_eq!(request.selected_component.as_deref(), Some("LED"));
        assert_eq!(request.model.as_deref(), Some("m"));

        let response = serde_json::to_value(GenerateCodeResponse {
            generated_code: "x".to_string(),
        })
        .unwrap();
        assert_eq!(response, serde_json::json!({"generatedCode": "x"}));
    }
}
