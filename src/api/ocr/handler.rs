// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR endpoint handlers

use axum::{extract::State, Json};
use axum_extra::extract::Multipart;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::request::UploadForm;
use super::response::{OcrDetectResponse, TextOnlyResponse};
use crate::api::errors::ApiError;
use crate::api::server::AppState;
use crate::vision::{
    decode_image_bytes, run_direct_ocr, run_ocr_detection, DebugTarget, ImageError, MangaModels,
};

/// Decode the validated upload into an image
fn decode_upload(form: &UploadForm) -> Result<image::DynamicImage, ApiError> {
    let file = form.image_file().map_err(|e| {
        warn!("Upload rejected: {}", e);
        e
    })?;

    let (image, info) = decode_image_bytes(&file.bytes).map_err(|e| {
        warn!("Failed to decode image: {}", e);
        match e {
            ImageError::TooLarge(..) => ApiError::PayloadTooLarge(e.to_string()),
            _ => ApiError::InvalidRequest(format!("Invalid image: {}", e)),
        }
    })?;
    debug!(
        "Decoded image: {}x{}, {:?}, {} bytes",
        info.width, info.height, info.format, info.size_bytes
    );
    Ok(image)
}

async fn load_models(state: &AppState) -> Result<Arc<MangaModels>, ApiError> {
    state.models.get_or_init().await.map_err(|e| {
        warn!("Models not available: {:#}", e);
        ApiError::ServiceUnavailable(format!("Models not loaded: {:#}", e))
    })
}

/// POST /ocr/detect - Detect text blocks and OCR every line
///
/// # Request (multipart/form-data)
/// - `file`: Page image with an `image/*` content type (required)
/// - `original_path`: Client-side path of the page, used to place the debug image
///
/// # Response
/// - `textBlocks`: Blocks in reading order with bbox, orientation and text
/// - `imageSize`: Page dimensions
/// - `debug`: Trace of the run
/// - `debugImagePath`: Written debug image, when enabled and saved
///
/// # Errors
/// - 400 Bad Request: Missing file, non-image content type, undecodable bytes
/// - 503 Service Unavailable: Models could not be loaded
/// - 500 Internal Server Error: Inference failed
pub async fn detect_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<OcrDetectResponse>, ApiError> {
    // 1. Parse and validate the upload
    let form = UploadForm::from_multipart(multipart).await?;
    let image = decode_upload(&form)?;

    // 2. Models (loaded on first use)
    let models = load_models(&state).await?;

    // 3. Debug image location
    let debug_base = state
        .config
        .debug_images
        .then(|| form.debug_base_path(&state.config.debug_dir()));
    let create_parent = form.may_create_debug_dir();

    // 4. Run detection and OCR off the async runtime
    let renderer = state.debug_renderer.clone();
    let output = tokio::task::spawn_blocking(move || {
        let target = debug_base.as_deref().map(|base_path| DebugTarget {
            renderer: &renderer,
            base_path,
            create_parent,
        });
        run_ocr_detection(&models, &image, target)
    })
    .await
    .map_err(|e| ApiError::InternalError(format!("OCR task failed: {}", e)))?
    .map_err(|e| {
        warn!("OCR processing failed: {:#}", e);
        ApiError::ProcessingFailed(format!("{:#}", e))
    })?;

    info!(
        "OCR detection complete: {} blocks on {}x{} page",
        output.blocks.len(),
        output.image_size.width,
        output.image_size.height
    );

    Ok(Json(output.into()))
}

/// POST /ocr/text-only - OCR a pre-cropped image without detection
///
/// # Request (multipart/form-data)
/// - `file`: Image with an `image/*` content type (required)
///
/// # Errors
/// Same mapping as `/ocr/detect`.
pub async fn text_only_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<TextOnlyResponse>, ApiError> {
    let form = UploadForm::from_multipart(multipart).await?;
    let image = decode_upload(&form)?;
    let models = load_models(&state).await?;

    let output = tokio::task::spawn_blocking(move || run_direct_ocr(&models, &image))
        .await
        .map_err(|e| ApiError::InternalError(format!("OCR task failed: {}", e)))?
        .map_err(|e| {
            warn!("Direct OCR failed: {:#}", e);
            ApiError::ProcessingFailed(format!("{:#}", e))
        })?;

    info!("Direct OCR complete: {} chars", output.text.chars().count());

    Ok(Json(output.into()))
}
