// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR response types

use serde::Serialize;

use crate::vision::{BlockResult, DetectionOutput, DirectOcrOutput, ImageSize};

/// Method reported by the text-only endpoint
pub const DIRECT_OCR_METHOD: &str = "direct_ocr";

/// Response from `/ocr/detect`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrDetectResponse {
    pub success: bool,
    /// Blocks in reading order
    pub text_blocks: Vec<BlockResult>,
    pub image_size: ImageSize,
    /// Trace of the run
    pub debug: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_image_path: Option<String>,
}

impl From<DetectionOutput> for OcrDetectResponse {
    fn from(output: DetectionOutput) -> Self {
        Self {
            success: true,
            text_blocks: output.blocks,
            image_size: output.image_size,
            debug: output.debug,
            debug_image_path: output
                .debug_image_path
                .map(|p| p.to_string_lossy().into_owned()),
        }
    }
}

/// Response from `/ocr/text-only`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextOnlyResponse {
    pub success: bool,
    pub text: String,
    pub image_size: ImageSize,
    pub method: String,
}

impl From<DirectOcrOutput> for TextOnlyResponse {
    fn from(output: DirectOcrOutput) -> Self {
        Self {
            success: true,
            text: output.text,
            image_size: output.image_size,
            method: DIRECT_OCR_METHOD.to_string(),
        }
    }
}
