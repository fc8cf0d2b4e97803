use std::sync::Arc;

use anyhow::Context;
use server::{AppState, config::ServerConfig, router};
use services::services::generation_api::{API_KEY_ENV, EnvGeneratorFactory};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    utils::logging::init_tracing("server=info,services=info,tower_http=info");

    let config = ServerConfig::from_env().context("invalid server configuration")?;
    let addr = config.bind_addr().context("invalid bind address")?;

    if utils::env::read_secret(API_KEY_ENV).is_err() {
        warn!(
            env_var = API_KEY_ENV,
            "Generation API key is not set; requests will fail until it is provided"
        );
    }

    let state = AppState::new(Arc::new(EnvGeneratorFactory::default()));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Code generation proxy listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
