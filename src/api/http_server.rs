// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::caption::{caption_handler, encoded_len_limit};
use super::form::{upload_page_handler, upload_submit_handler, url_page_handler, url_submit_handler};
use super::session::{
    attach_image_handler, attach_url_handler, caption_session_handler, create_session_handler,
    delete_session_handler, get_session_handler, SessionStore, StoreMetrics,
};
use crate::caption::{CaptionModel, CaptionService, ImageFetcher};
use crate::config::CaptionConfig;
use crate::vision::{ModelInfo, ModelManager};

/// Shared state for every front-end
#[derive(Clone)]
pub struct AppState {
    pub service: CaptionService,
    pub models: Arc<ModelManager>,
    pub sessions: SessionStore,
    pub config: Arc<CaptionConfig>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(service: CaptionService, models: Arc<ModelManager>, config: CaptionConfig) -> Self {
        Self {
            service,
            models,
            sessions: SessionStore::new(config.max_sessions).with_ttl(config.session_ttl()),
            config: Arc::new(config),
            started_at: Utc::now(),
        }
    }

    /// Load the model through `models` and wire up the caption service
    pub async fn load(models: Arc<ModelManager>, config: CaptionConfig) -> Result<Self> {
        let model = models.get_or_load().await?;
        let fetcher = ImageFetcher::new(config.fetch_timeout(), config.max_image_bytes)
            .context("Failed to create HTTP client")?;
        let service =
            CaptionService::new(model, fetcher).with_max_image_bytes(config.max_image_bytes);
        Ok(Self::new(service, models, config))
    }

    /// State around an in-memory model with default configuration
    pub fn new_for_test(model: Arc<dyn CaptionModel>) -> Result<Self> {
        Self::with_config(model, CaptionConfig::default())
    }

    pub fn with_config(model: Arc<dyn CaptionModel>, config: CaptionConfig) -> Result<Self> {
        let models = Arc::new(ModelManager::preloaded(model.clone(), config.max_length));
        let fetcher = ImageFetcher::new(config.fetch_timeout(), config.max_image_bytes)?;
        let service =
            CaptionService::new(model, fetcher).with_max_image_bytes(config.max_image_bytes);
        Ok(Self::new(service, models, config))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub model_loaded: bool,
    pub sessions: usize,
    pub session_metrics: StoreMetrics,
    pub uptime_secs: i64,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
}

/// Build the router with every front-end mounted
pub fn create_app(state: AppState) -> Router {
    // base64 JSON bodies are ~4/3 of the image size
    let body_limit = encoded_len_limit(state.config.max_image_bytes).saturating_add(64 * 1024);

    Router::new()
        // Upload form
        .route("/", get(upload_page_handler))
        .route("/caption", post(upload_submit_handler))
        // Upload-or-URL form
        .route("/caption/url", get(url_page_handler).post(url_submit_handler))
        // Caption sessions
        .route("/v1/sessions", post(create_session_handler))
        .route(
            "/v1/sessions/:id",
            get(get_session_handler).delete(delete_session_handler),
        )
        .route("/v1/sessions/:id/image", put(attach_image_handler))
        .route("/v1/sessions/:id/url", put(attach_url_handler))
        .route("/v1/sessions/:id/caption", post(caption_session_handler))
        // JSON API
        .route("/v1/caption", post(caption_handler))
        .route("/v1/models", get(models_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn start_server(state: AppState) -> Result<()> {
    let addr: SocketAddr = state
        .config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address '{}'", state.config.listen_addr))?;

    let cleanup = state
        .sessions
        .spawn_cleanup_task(state.config.session_cleanup_interval());

    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Caption server listening on http://{}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error");

    cleanup.abort();
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session_metrics = state.sessions.get_store_metrics().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.service.model_name().to_string(),
        model_loaded: state.models.is_loaded(),
        sessions: session_metrics.total_sessions,
        session_metrics,
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
        version: crate::version::VERSION_NUMBER.to_string(),
    })
}

async fn models_handler(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: state.models.info().into_iter().collect(),
    })
}
