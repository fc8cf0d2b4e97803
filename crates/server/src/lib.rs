use std::sync::Arc;

use axum::Router;
use services::services::{code_generation::CodeGenerationService, generation_api::GeneratorFactory};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub code_generation: CodeGenerationService,
}

impl AppState {
    pub fn new(generators: Arc<dyn GeneratorFactory>) -> Self {
        Self {
            code_generation: CodeGenerationService::new(generators),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api", routes::generate_code::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
