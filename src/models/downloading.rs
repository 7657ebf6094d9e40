// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model weight fetching from the Hugging Face Hub
//!
//! Files already on disk are never downloaded again.

use anyhow::Context;
use hf_hub::api::sync::{Api, ApiBuilder};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::vision::manga_ocr::{ModelLayout, COMBINED_FILE, VOCAB_FILE};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Missing model files: {}", display_paths(.0))]
    MissingFiles(Vec<PathBuf>),

    #[error("Failed to initialize Hugging Face client: {0}")]
    ClientInit(String),

    #[error("Download of {repo_id}/{filename} failed: {message}")]
    Hub {
        repo_id: String,
        filename: String,
        message: String,
    },

    #[error("Failed to install {}: {source}", .path.display())]
    Install {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Where model files come from
pub trait ModelSource {
    /// Fetch `filename` from `repo_id`, returning a local path to read it from
    fn fetch(&self, repo_id: &str, filename: &str) -> Result<PathBuf, DownloadError>;
}

/// Hugging Face Hub through the local hf-hub cache
pub struct HubSource {
    api: Api,
}

impl HubSource {
    pub fn new() -> Result<Self, DownloadError> {
        let api = ApiBuilder::new()
            .with_progress(true)
            .build()
            .map_err(|e| DownloadError::ClientInit(e.to_string()))?;
        Ok(Self { api })
    }
}

impl ModelSource for HubSource {
    fn fetch(&self, repo_id: &str, filename: &str) -> Result<PathBuf, DownloadError> {
        info!("📥 Downloading {}/{}", repo_id, filename);
        self.api
            .model(repo_id.to_string())
            .get(filename)
            .map_err(|e| DownloadError::Hub {
                repo_id: repo_id.to_string(),
                filename: filename.to_string(),
                message: e.to_string(),
            })
    }
}

/// Outcome of a fetch run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchReport {
    pub downloaded: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Files the service needs that are not on disk
///
/// A manga-ocr directory without either layout reports the split layout's
/// files.
pub fn missing_files(config: &ServiceConfig) -> Vec<PathBuf> {
    let mut missing = Vec::new();
    if !config.detector_model.exists() {
        missing.push(config.detector_model.clone());
    }

    let ocr_dir = &config.ocr_model_dir;
    let vocab = ocr_dir.join(VOCAB_FILE);
    if !vocab.exists() {
        missing.push(vocab);
    }
    if ModelLayout::detect(ocr_dir).is_none() {
        missing.extend(
            ModelLayout::Split
                .model_files()
                .iter()
                .map(|f| ocr_dir.join(f))
                .filter(|p| !p.exists()),
        );
    }
    missing
}

/// Check that every model file is on disk without touching the network
pub fn ensure_present(config: &ServiceConfig) -> Result<(), DownloadError> {
    let missing = missing_files(config);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(DownloadError::MissingFiles(missing))
    }
}

fn install(cached: &Path, target: &Path) -> Result<(), DownloadError> {
    let install_err = |source: std::io::Error| DownloadError::Install {
        path: target.to_path_buf(),
        source,
    };
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(install_err)?;
    }
    std::fs::copy(cached, target).map_err(install_err)?;
    debug!("Installed {} -> {}", cached.display(), target.display());
    Ok(())
}

fn fetch_file<S: ModelSource>(
    source: &S,
    repo_id: &str,
    filename: &str,
    target: PathBuf,
    report: &mut FetchReport,
) -> Result<(), DownloadError> {
    if target.exists() {
        debug!("{} already present", target.display());
        report.skipped.push(target);
        return Ok(());
    }
    let cached = source.fetch(repo_id, filename)?;
    install(&cached, &target)?;
    report.downloaded.push(target);
    Ok(())
}

fn fetch_ocr_layout<S: ModelSource>(
    source: &S,
    repo_id: &str,
    ocr_dir: &Path,
    report: &mut FetchReport,
) -> Result<(), DownloadError> {
    if let Some(layout) = ModelLayout::detect(ocr_dir) {
        report
            .skipped
            .extend(layout.model_files().iter().map(|f| ocr_dir.join(f)));
        return Ok(());
    }

    // Split first, the combined export only when the repo has no split files
    let split: Result<Vec<(PathBuf, &str)>, DownloadError> = ModelLayout::Split
        .model_files()
        .iter()
        .map(|f| source.fetch(repo_id, f).map(|cached| (cached, *f)))
        .collect();

    match split {
        Ok(files) => {
            for (cached, name) in files {
                let target = ocr_dir.join(name);
                install(&cached, &target)?;
                report.downloaded.push(target);
            }
            Ok(())
        }
        Err(split_err) => {
            debug!("Split layout unavailable in {}: {}", repo_id, split_err);
            match source.fetch(repo_id, COMBINED_FILE) {
                Ok(cached) => {
                    let target = ocr_dir.join(COMBINED_FILE);
                    install(&cached, &target)?;
                    report.downloaded.push(target);
                    Ok(())
                }
                Err(_) => Err(split_err),
            }
        }
    }
}

/// Fetch every missing model file from `source`
pub fn fetch_with<S: ModelSource>(
    source: &S,
    config: &ServiceConfig,
) -> Result<FetchReport, DownloadError> {
    let mut report = FetchReport::default();

    fetch_file(
        source,
        &config.detector_repo,
        &config.detector_file,
        config.detector_model.clone(),
        &mut report,
    )?;

    match &config.ocr_repo {
        Some(repo_id) => {
            fetch_file(
                source,
                repo_id,
                VOCAB_FILE,
                config.ocr_model_dir.join(VOCAB_FILE),
                &mut report,
            )?;
            fetch_ocr_layout(source, repo_id, &config.ocr_model_dir, &mut report)?;
        }
        None => {
            if ModelLayout::detect(&config.ocr_model_dir).is_none() {
                warn!(
                    "No manga-ocr model in {} and MANGA_OCR_REPO is not set",
                    config.ocr_model_dir.display()
                );
            }
        }
    }

    Ok(report)
}

/// Download missing weights from the Hugging Face Hub
pub async fn fetch_models(config: &ServiceConfig) -> anyhow::Result<FetchReport> {
    let config = config.clone();
    let report = tokio::task::spawn_blocking(move || {
        let source = HubSource::new()?;
        fetch_with(&source, &config)
    })
    .await
    .context("Model download task failed")??;

    info!(
        "✅ Models fetched: {} downloaded, {} already present",
        report.downloaded.len(),
        report.skipped.len()
    );
    Ok(report)
}
