// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing for manga pages
//!
//! This module provides:
//! - Text block and line detection via comic-text-detector
//! - Japanese text recognition via manga-ocr
//! - Debug images of detection results
//!
//! Both models run through ONNX Runtime on CPU or CUDA.

pub mod crop;
pub mod debug_image;
pub mod detection;
pub mod geometry;
pub mod image_utils;
pub mod manga_ocr;
pub mod model_manager;
pub mod pipeline;
pub mod session;

pub use debug_image::DebugRenderer;
pub use image_utils::{decode_image_bytes, detect_format, is_image_content_type, ImageError, ImageInfo};
pub use model_manager::{MangaModels, VisionModelConfig, VisionModelInfo, VisionModelManager};
pub use pipeline::{
    recognize_blocks, run_direct_ocr, run_ocr_detection, BlockResult, DebugTarget, DetectionOutput,
    DirectOcrOutput, ImageSize, BLOCK_CONFIDENCE,
};
pub use session::Device;
