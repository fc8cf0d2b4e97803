use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::code_generation::{CodeGenerationError, ErrorResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    CodeGeneration(#[from] CodeGenerationError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::CodeGeneration(CodeGenerationError::MissingFields(_)) => StatusCode::BAD_REQUEST,
            Self::CodeGeneration(CodeGenerationError::MissingCredential)
            | Self::CodeGeneration(CodeGenerationError::Upstream(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let payload = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(payload)).into_response()
    }
}
