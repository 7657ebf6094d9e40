// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::health::health_handler;
use crate::api::ocr::{detect_handler, text_only_handler};
use crate::config::ServiceConfig;
use crate::vision::image_utils::MAX_IMAGE_SIZE;
use crate::vision::{DebugRenderer, VisionModelConfig, VisionModelManager};

/// Room for multipart boundaries and the `original_path` field
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub models: Arc<VisionModelManager>,
    pub debug_renderer: Arc<DebugRenderer>,
}

impl AppState {
    /// Build the state without loading any model
    pub fn new(config: ServiceConfig) -> Self {
        let models = VisionModelManager::new(VisionModelConfig::from(&config));
        let debug_renderer = DebugRenderer::new(config.font_path.as_deref());
        if config.debug_images && !debug_renderer.has_font() {
            warn!("No usable font found, debug images will have no labels");
        }

        Self {
            config: Arc::new(config),
            models: Arc::new(models),
            debug_renderer: Arc::new(debug_renderer),
        }
    }
}

fn cors_layer(config: &ServiceConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Skipping invalid CORS origin {}: {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ocr/detect", post(detect_handler))
        .route("/ocr/text-only", post(text_only_handler))
        .layer(DefaultBodyLimit::max(MAX_IMAGE_SIZE + MULTIPART_OVERHEAD))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
    }
}

/// Load the models, then serve until Ctrl-C
///
/// A failed model load is logged and the server still starts; OCR
/// requests retry the load and answer 503 while it keeps failing.
pub async fn start_server(config: ServiceConfig) -> Result<()> {
    let addr = config.listen_addr()?;
    let state = AppState::new(config);

    info!("🔄 Loading models...");
    if let Err(e) = state.models.get_or_init().await {
        warn!("⚠️ Models unavailable at startup: {:#}", e);
    }

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🚀 Manga inference service listening on http://{}", addr);
    info!(
        "Debug images: {}",
        if state.config.debug_images {
            "enabled"
        } else {
            "disabled"
        }
    );

    let app = create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}
