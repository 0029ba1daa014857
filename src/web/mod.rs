pub mod extractors;
pub mod handlers;
pub mod middleware;

use crate::{models::ModelManager, Config, Result};
use axum::{
    extract::DefaultBodyLimit,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

/// Shared, read-only state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub models: Arc<ModelManager>,
}

impl AppState {
    pub fn new(config: Config, models: Arc<ModelManager>) -> Self {
        Self { config, models }
    }
}

pub async fn serve(config: Config) -> Result<()> {
    // Load models once; the service stays up even if this fails
    let models = Arc::new(ModelManager::load(&config));
    let addr = config.socket_addr()?;

    let app = create_app(AppState::new(config, models));

    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  GET  /status   - Model status");
    tracing::info!("  POST /predict  - Gesture prediction from a base64 image");
    tracing::info!("  GET  /health   - Liveness check");

    let listener = TcpListener::bind(&addr).await?;

    axum::serve(listener, app).await.map_err(|e| {
        crate::utils::error::SignError::Internal(format!("Server failed: {}", e))
    })?;

    Ok(())
}

pub fn create_app(state: AppState) -> Router {
    let server_config = state.config.server_config.clone();

    Router::new()
        .route("/status", get(handlers::status_handler))
        .route("/predict", post(handlers::predict_handler))
        .route("/health", get(health_handler))
        .layer(axum::middleware::from_fn(middleware::request_logging))
        .layer(DefaultBodyLimit::max(server_config.max_request_size))
        .layer(RequestBodyLimitLayer::new(server_config.max_request_size))
        .layer(TimeoutLayer::new(Duration::from_secs(
            server_config.request_timeout,
        )))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness only; model state is reported by `/status`
async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
