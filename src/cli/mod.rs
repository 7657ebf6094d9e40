// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::api::ocr::OcrDetectResponse;
use crate::api::server::start_server;
use crate::config::ServiceConfig;
use crate::models::{ensure_present, fetch_models};
use crate::vision::{
    decode_image_bytes, run_direct_ocr, run_ocr_detection, DebugRenderer, DebugTarget,
    VisionModelConfig, VisionModelManager,
};

/// Manga page text detection and OCR service
#[derive(Parser, Debug)]
#[command(name = "manga-inference")]
#[command(version)]
#[command(about = "Comic text detection and Japanese OCR over HTTP", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub config: ServiceConfig,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP service (default)
    Serve,

    /// Detect and read every text block on a page, printing JSON
    Detect {
        /// Page image
        #[arg(long)]
        input: PathBuf,

        /// Path the debug image is named after (defaults to the input)
        #[arg(long)]
        original_path: Option<PathBuf>,
    },

    /// Read a pre-cropped text image, printing the text
    Ocr {
        /// Cropped text image
        #[arg(long)]
        input: PathBuf,
    },

    /// Download missing model weights
    FetchModels,
}

async fn read_image(path: &Path) -> Result<DynamicImage> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let (image, _) = decode_image_bytes(&bytes)
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    Ok(image)
}

async fn detect(config: ServiceConfig, input: PathBuf, original_path: Option<PathBuf>) -> Result<()> {
    let image = read_image(&input).await?;
    let manager = VisionModelManager::new(VisionModelConfig::from(&config));
    let models = manager.get_or_init().await?;

    let renderer = DebugRenderer::new(config.font_path.as_deref());
    let debug_base = config
        .debug_images
        .then(|| original_path.unwrap_or_else(|| input.clone()));

    let output = tokio::task::spawn_blocking(move || {
        let target = debug_base.as_deref().map(|base_path| DebugTarget {
            renderer: &renderer,
            base_path,
            create_parent: false,
        });
        run_ocr_detection(&models, &image, target)
    })
    .await
    .context("Detection task failed")??;

    let response = OcrDetectResponse::from(output);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn ocr(config: ServiceConfig, input: PathBuf) -> Result<()> {
    let image = read_image(&input).await?;
    let manager = VisionModelManager::new(VisionModelConfig::from(&config));
    let models = manager.get_or_init().await?;

    let output = tokio::task::spawn_blocking(move || run_direct_ocr(&models, &image))
        .await
        .context("OCR task failed")??;
    println!("{}", output.text);
    Ok(())
}

async fn fetch(config: ServiceConfig) -> Result<()> {
    let report = fetch_models(&config).await?;
    for path in &report.downloaded {
        info!("Downloaded {}", path.display());
    }
    if let Err(e) = ensure_present(&config) {
        warn!("⚠️ {}", e);
    }
    Ok(())
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let config = cli.config;
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => start_server(config).await,
        Commands::Detect {
            input,
            original_path,
        } => detect(config, input, original_path).await,
        Commands::Ocr { input } => ocr(config, input).await,
        Commands::FetchModels => fetch(config).await,
    }
}
