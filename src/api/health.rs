// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::server::AppState;

pub const SERVICE_NAME: &str = "manga-inference";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    pub debug_images_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthModels {
    pub loaded: bool,
    /// Device the loaded models run on, `null` until they are loaded
    pub device: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub config: HealthConfig,
    pub models: HealthModels,
}

impl HealthResponse {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            status: "healthy".to_string(),
            service: SERVICE_NAME.to_string(),
            config: HealthConfig {
                debug_images_enabled: state.config.debug_images,
            },
            models: HealthModels {
                loaded: state.models.is_loaded(),
                device: state.models.device().map(|d| d.to_string()),
            },
        }
    }
}

/// GET /health
///
/// Never triggers model loading.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::from_state(&state))
}
