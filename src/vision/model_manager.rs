// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model manager for the text detector and manga-ocr

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::config::{DeviceKind, ServiceConfig};
use crate::vision::detection::ComicTextDetector;
use crate::vision::manga_ocr::MangaOcr;
use crate::vision::session::{resolve_device, Device};

/// Configuration for loading the models
#[derive(Debug, Clone)]
pub struct VisionModelConfig {
    /// comic-text-detector ONNX file
    pub detector_model: PathBuf,
    /// manga-ocr model directory
    pub ocr_model_dir: PathBuf,
    /// Requested device
    pub device: DeviceKind,
    /// Intra-op threads per session
    pub intra_threads: usize,
}

impl From<&ServiceConfig> for VisionModelConfig {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            detector_model: config.detector_model.clone(),
            ocr_model_dir: config.ocr_model_dir.clone(),
            device: config.device,
            intra_threads: config.intra_threads,
        }
    }
}

impl Default for VisionModelConfig {
    fn default() -> Self {
        Self::from(&ServiceConfig::default())
    }
}

/// Information about a managed model
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionModelInfo {
    /// Model name
    pub name: String,
    /// Model type (detection, ocr)
    pub model_type: String,
    /// Whether the model is loaded
    pub available: bool,
}

/// Both loaded models
#[derive(Debug)]
pub struct MangaModels {
    pub detector: ComicTextDetector,
    pub ocr: MangaOcr,
    pub device: Device,
}

impl MangaModels {
    /// Load both models synchronously
    pub fn load(config: &VisionModelConfig) -> Result<Self> {
        let device = resolve_device(config.device);
        info!(
            "Loading models on {} (detector: {}, manga-ocr: {})",
            device,
            config.detector_model.display(),
            config.ocr_model_dir.display()
        );

        let detector = ComicTextDetector::new(&config.detector_model, device, config.intra_threads)?;
        let ocr = MangaOcr::new(&config.ocr_model_dir, device, config.intra_threads)?;

        Ok(Self {
            detector,
            ocr,
            device,
        })
    }
}

/// Loads the models once and hands out shared references
///
/// Concurrent callers wait for the same load. A failed load leaves the
/// manager empty so the next call tries again.
#[derive(Debug)]
pub struct VisionModelManager {
    config: VisionModelConfig,
    models: OnceCell<Arc<MangaModels>>,
}

impl VisionModelManager {
    pub fn new(config: VisionModelConfig) -> Self {
        Self {
            config,
            models: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &VisionModelConfig {
        &self.config
    }

    /// Get the models, loading them on first use
    pub async fn get_or_init(&self) -> Result<Arc<MangaModels>> {
        self.models
            .get_or_try_init(|| async {
                let config = self.config.clone();
                let loaded = tokio::task::spawn_blocking(move || MangaModels::load(&config))
                    .await
                    .context("Model loading task failed")?;

                match loaded {
                    Ok(models) => {
                        info!("✅ Models ready on {}", models.device);
                        Ok(Arc::new(models))
                    }
                    Err(e) => {
                        warn!("⚠️ Failed to load models: {:#}", e);
                        Err(e)
                    }
                }
            })
            .await
            .cloned()
    }

    /// Loaded models without triggering a load
    pub fn get(&self) -> Option<Arc<MangaModels>> {
        self.models.get().cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.models.initialized()
    }

    /// Device of the loaded models
    pub fn device(&self) -> Option<Device> {
        self.models.get().map(|m| m.device)
    }

    /// List the managed models
    pub fn list_models(&self) -> Vec<VisionModelInfo> {
        let loaded = self.is_loaded();
        vec![
            VisionModelInfo {
                name: "comic-text-detector".to_string(),
                model_type: "detection".to_string(),
                available: loaded,
            },
            VisionModelInfo {
                name: "manga-ocr".to_string(),
                model_type: "ocr".to_string(),
                available: loaded,
            },
        ]
    }
}
